use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    Config(String),

    #[error("Engine not connected: {0}")]
    NotConnected(String),

    #[error("Engine operation failed: {0}")]
    OperationFailed(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
