use thiserror::Error;

/// Failure of a host capability.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
