//! Per-data-rate constants for the LoRaWAN timeslot engine, and the two
//! boundary error kinds the rest of the workspace rejects inputs with.

pub mod data_rate;
pub mod error;

pub use data_rate::{DataRate, SlotParameters, TABLE};
pub use error::SlotModelError;
