use thiserror::Error;

/// The two boundary error kinds the timeslot engine rejects inputs with.
///
/// Everything else (flat observations, degenerate candidates, empty
/// periodicity lists) is handled internally and never surfaces as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotModelError {
    #[error("invalid data rate index {0}, expected 0..=5")]
    InvalidDataRate(u8),

    #[error("observation length mismatch: expected {expected} slots, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
