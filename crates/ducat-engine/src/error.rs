use thiserror::Error;

/// Failure taxonomy. Everything here is local to a single operation;
/// errors surfaced before any mutation leave no side effects. Domain
/// results that *do* carry side effects on the failure path (a password
/// miss fee, a failed hack roll) are outcome values, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("on cooldown for another {0}s")]
    Cooldown(i64),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
