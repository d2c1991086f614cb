//! Candidate Finder, TiCom Scorer, and Periodicity Miner.
//!
//! These three are grouped in one crate because the Miner's control loop
//! directly drives the other two on every iteration and none of them has a
//! meaningful reuse boundary with anything outside this group.

pub mod candidate_finder;
pub mod miner;
pub mod scorer;

pub use candidate_finder::find_candidate;
pub use miner::{Miner, LOCAL_SEARCH_WIDTH};
pub use scorer::score;
