//! Firebase Storage download URL resolution

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_library::gateway::{storage_object_path, AssetResolver};
use core_runtime::config::CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{FirestoreError, Result};
use crate::types::StorageObject;

/// Firebase Storage API base URL
pub const STORAGE_API_BASE: &str = "https://firebasestorage.googleapis.com/v0";

/// Turns `gs://bucket/path` and `/path` references into token-bearing
/// download URLs.
///
/// Objects are looked up in the configured bucket; the bucket segment of a
/// `gs://` reference is ignored.
pub struct FirebaseStorageResolver {
    http_client: Arc<dyn HttpClient>,
    bucket: String,
    access_token: Option<String>,
    timeout: Duration,
    base_url: String,
}

impl FirebaseStorageResolver {
    pub fn new(http_client: Arc<dyn HttpClient>, bucket: impl Into<String>) -> Self {
        Self {
            http_client,
            bucket: bucket.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
            base_url: STORAGE_API_BASE.to_string(),
        }
    }

    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &CoreConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            timeout: config.request_timeout(),
            ..Self::new(http_client, config.storage_bucket.clone())
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            urlencoding::encode(path)
        )
    }

    /// Fetch object metadata and build the download URL for `path`.
    async fn download_url(&self, path: &str) -> Result<String> {
        let object_url = self.object_url(path);

        let mut request = HttpRequest::new(HttpMethod::Get, object_url.as_str())
            .header("Accept", "application/json")
            .timeout(self.timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_token(token.as_str());
        }

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(FirestoreError::AssetUnavailable {
                path: path.to_string(),
                message: format!("metadata request returned status {}", response.status),
            });
        }

        let object: StorageObject = response
            .json()
            .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

        let token = object
            .first_download_token()
            .ok_or_else(|| FirestoreError::AssetUnavailable {
                path: path.to_string(),
                message: "object has no download token".to_string(),
            })?;

        Ok(format!(
            "{}?alt=media&token={}",
            object_url,
            urlencoding::encode(token)
        ))
    }
}

#[async_trait]
impl AssetResolver for FirebaseStorageResolver {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn resolve(&self, reference: &str) -> core_library::Result<String> {
        let path = storage_object_path(reference)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| FirestoreError::AssetUnavailable {
                path: reference.to_string(),
                message: "not a storage reference".to_string(),
            })?;

        let url = self.download_url(path).await?;
        debug!("Resolved storage reference");
        Ok(url)
    }
}
