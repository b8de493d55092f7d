use thiserror::Error;

/// Errors surfaced by [`solve`](crate::solve).
#[derive(Debug, Error)]
pub enum SolveError {
    /// Rejected synchronously, before any search work starts.
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// A cancellation token fired or the timeout watchdog went off. Partial
    /// results are discarded.
    #[error("solve was cancelled before completing")]
    Cancelled,

    /// A violated internal invariant. Should never occur.
    #[error("internal solver invariant violated: {0}")]
    Internal(&'static str),
}
