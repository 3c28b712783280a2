//! Error types for the Firestore provider

use core_library::LibraryError;
use thiserror::Error;

/// Firestore and Firebase Storage errors
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// API request returned an error status
    #[error("Firestore API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Throttling or server errors persisted through every retry
    #[error("Firestore unavailable after {attempts} attempts (last status {status_code})")]
    RetriesExhausted { attempts: u32, status_code: u16 },

    /// Merge update targeted a document that does not exist
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Storage object has no usable download URL
    #[error("Storage object {path} unavailable: {message}")]
    AssetUnavailable { path: String, message: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Firestore operations
pub type Result<T> = std::result::Result<T, FirestoreError>;

impl From<FirestoreError> for LibraryError {
    fn from(error: FirestoreError) -> Self {
        match error {
            FirestoreError::AssetUnavailable { path, message } => {
                LibraryError::AssetResolutionFailure {
                    reference: path,
                    message,
                }
            }
            other => LibraryError::SyncFailure(other.to_string()),
        }
    }
}
