use thiserror::Error;

/// Errors surfaced by the scheduling engine.
///
/// Every failure is local to the single operation that raised it; there is
/// no partial write to undo because each submission runs in one transaction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("problem set {0} not found")]
    SetNotFound(i64),

    #[error("problem {0} not found")]
    ProblemNotFound(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
