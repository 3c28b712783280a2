//! Remote catalog seams
//!
//! The store only talks to the remote catalog through [`CatalogGateway`];
//! storage references inside documents are turned into fetchable URLs by an
//! [`AssetResolver`]. Concrete implementations live in provider crates.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Track, TrackDraft, TrackId, TrackPatch};

/// Read and write access to the shared track catalog.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch every track in the catalog, in catalog order.
    ///
    /// Storage references are resolved per track; a resolution failure keeps
    /// the raw value. Fails with `SyncFailure` when the listing itself fails.
    async fn fetch_all(&self) -> Result<Vec<Track>>;

    /// Id of the first document whose `url` equals `url`.
    ///
    /// Never fails: lookup errors are logged and reported as `None`.
    async fn find_id_by_url(&self, url: &str) -> Option<TrackId>;

    /// Merge-update an existing document. Fails if the document is missing.
    async fn update(&self, id: &TrackId, patch: &TrackPatch) -> Result<()>;

    /// Merge-write a document, creating it if missing.
    async fn upsert(&self, id: &TrackId, patch: &TrackPatch) -> Result<()>;

    /// Create a new document and return its id.
    async fn create(&self, draft: &TrackDraft) -> Result<TrackId>;
}

/// Turns an object-storage reference into a fetchable URL.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns `AssetResolutionFailure` when the object has no download URL.
    async fn resolve(&self, reference: &str) -> Result<String>;
}

/// Whether a stored URL points into object storage rather than the web.
///
/// `gs://bucket/path` and bucket-relative `/path` values qualify.
pub fn is_storage_reference(value: &str) -> bool {
    value.starts_with("gs://") || value.starts_with('/')
}

/// Object path inside the bucket for a storage reference.
///
/// ```
/// use core_library::gateway::storage_object_path;
///
/// assert_eq!(storage_object_path("gs://bucket/audio/a.mp3"), Some("audio/a.mp3"));
/// assert_eq!(storage_object_path("/audio/a.mp3"), Some("audio/a.mp3"));
/// assert_eq!(storage_object_path("https://cdn/a.mp3"), None);
/// ```
pub fn storage_object_path(reference: &str) -> Option<&str> {
    if let Some(rest) = reference.strip_prefix("gs://") {
        // Drop the bucket segment
        return rest.split_once('/').map(|(_, path)| path);
    }
    reference.strip_prefix('/')
}
