use thiserror::Error;

/// Errors produced by the gadget session layer.
#[derive(Debug, Error)]
pub enum GwatchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("gadget start failed: {0}")]
    ExecutionStart(String),

    #[error("gadget stop failed: {0}")]
    ExecutionStop(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type GwatchResult<T> = Result<T, GwatchError>;
