//! Error types for the clause-exchange runtime

use thiserror::Error;

/// Result type alias for exchange construction and host operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;

/// Errors that can be surfaced to the host process
///
/// Protocol misuse (appending to a completed set, completing twice, acknowledging
/// out of order) is not represented here: those are invariant violations and
/// panic on the offending thread.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange was configured with zero workers
    #[error("at least one worker is required")]
    NoWorkers,

    /// A mailbox structure could not be allocated
    #[error("could not allocate memory for {what} ({count} entries)")]
    Allocation { what: &'static str, count: usize },

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread panicked before reporting its statistics
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}
