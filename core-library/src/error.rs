use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// Listing or write against the remote catalog failed.
    #[error("Sync failed: {0}")]
    SyncFailure(String),

    /// A storage reference could not be turned into a fetchable URL.
    #[error("Could not resolve asset {reference}: {message}")]
    AssetResolutionFailure { reference: String, message: String },

    #[error("Entity not found: {entity_type} with {key}")]
    NotFound { entity_type: String, key: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
