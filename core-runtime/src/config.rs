//! # Core Configuration Module
//!
//! Provides configuration management for the music library core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the Firebase project coordinates, tuning knobs for the
//! catalog gateway and the injected `HttpClient` bridge. It enforces fail-fast
//! validation so a misconfigured host fails at startup instead of on the
//! first sync.
//!
//! ## Required Settings
//!
//! - `project_id` - Firebase project hosting the Firestore catalog
//! - `api_key` - Web API key sent with every REST call
//! - `storage_bucket` - Cloud Storage bucket used to resolve `gs://` artwork
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, a `ReqwestHttpClient` is
//! injected automatically if none was provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .project_id("music-app")
//!     .api_key("AIza...")
//!     .storage_bucket("music-app.appspot.com")
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing api_key and storage_bucket
//! let config = CoreConfig::builder()
//!     .project_id("music-app")
//!     .build()
//!     .expect("Should fail - missing required settings");
//! ```

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the Firebase project id.
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
/// Environment variable holding the Firebase web API key.
pub const ENV_API_KEY: &str = "FIREBASE_API_KEY";
/// Environment variable holding the Cloud Storage bucket.
pub const ENV_STORAGE_BUCKET: &str = "FIREBASE_STORAGE_BUCKET";
/// Environment variable overriding the catalog collection name.
pub const ENV_COLLECTION: &str = "FIREBASE_TRACKS_COLLECTION";

/// Default Firestore collection holding track documents.
pub const DEFAULT_COLLECTION: &str = "tracks";
/// Default artwork shown for playlists whose first member has none.
pub const DEFAULT_PLACEHOLDER_ARTWORK: &str = "asset://images/unknown_track.png";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 300;
const MAX_PAGE_SIZE: u32 = 1000;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Core configuration for the music library core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Firebase project id
    pub project_id: String,

    /// Firebase web API key
    pub api_key: String,

    /// Cloud Storage bucket for artwork and audio objects
    pub storage_bucket: String,

    /// Firestore collection holding the track documents
    pub collection: String,

    /// Optional OAuth bearer token for authenticated Firestore access
    pub access_token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Number of documents requested per list page
    pub page_size: u32,

    /// Attempts per remote call (including the first)
    pub max_retries: u32,

    /// Artwork URI used when a playlist preview has no artwork
    pub placeholder_artwork: String,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// HTTP client for making API requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("storage_bucket", &self.storage_bucket)
            .field("collection", &self.collection)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("max_retries", &self.max_retries)
            .field("placeholder_artwork", &self.placeholder_artwork)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the injected HTTP client or the desktop default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when no client was injected and
    /// the `desktop-shims` feature is disabled.
    pub fn resolve_http_client(&self) -> Result<Arc<dyn HttpClient>> {
        match &self.http_client {
            Some(client) => Ok(Arc::clone(client)),
            None => provide_default_http_client(self.request_timeout()),
        }
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Project id, API key, bucket and collection are not blank
    /// - Timeout is within 1..=300 seconds
    /// - Page size is within 1..=1000
    /// - At least one attempt is allowed per remote call
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Project id", &self.project_id),
            ("API key", &self.api_key),
            ("Storage bucket", &self.storage_bucket),
            ("Collection", &self.collection),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.collection.contains('/') {
            return Err(Error::Config(format!(
                "Collection '{}' must be a top-level collection id without '/'",
                self.collection
            )));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(Error::Config(
                "Request timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.max_retries == 0 {
            return Err(Error::Config(
                "max_retries must allow at least one attempt".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required to reach Firestore. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Mobile: inject the platform-native HTTP stack (URLSession/OkHttp)."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    project_id: Option<String>,
    api_key: Option<String>,
    storage_bucket: Option<String>,
    collection: Option<String>,
    access_token: Option<String>,
    request_timeout_secs: Option<u64>,
    page_size: Option<u32>,
    max_retries: Option<u32>,
    placeholder_artwork: Option<String>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Pre-fills the builder from the process environment.
    ///
    /// Reads `FIREBASE_PROJECT_ID`, `FIREBASE_API_KEY`,
    /// `FIREBASE_STORAGE_BUCKET` and `FIREBASE_TRACKS_COLLECTION`. Unset
    /// variables are skipped so later setters or `build()` can report them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnv`] if a variable is set but not valid UTF-8.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let read = |variable: &str| -> Result<Option<String>> {
            match lookup(variable) {
                Ok(value) => Ok(Some(value)),
                Err(std::env::VarError::NotPresent) => Ok(None),
                Err(std::env::VarError::NotUnicode(_)) => Err(Error::InvalidEnv {
                    variable: variable.to_string(),
                    message: "value is not valid UTF-8".to_string(),
                }),
            }
        };

        Ok(Self {
            project_id: read(ENV_PROJECT_ID)?,
            api_key: read(ENV_API_KEY)?,
            storage_bucket: read(ENV_STORAGE_BUCKET)?,
            collection: read(ENV_COLLECTION)?,
            ..Self::default()
        })
    }

    /// Sets the Firebase project id.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().project_id("music-app");
    /// ```
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the Firebase web API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the Cloud Storage bucket (e.g. `music-app.appspot.com`).
    pub fn storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    /// Overrides the Firestore collection (default: `tracks`).
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets an OAuth bearer token sent alongside the API key.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the per-request timeout in seconds (default: 30).
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Sets the list page size (default: 300, max: 1000).
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the attempt budget per remote call (default: 3).
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = Some(attempts);
        self
    }

    /// Sets the placeholder artwork URI used by playlist previews.
    pub fn placeholder_artwork(mut self, uri: impl Into<String>) -> Self {
        self.placeholder_artwork = Some(uri.into());
        self
    }

    /// Sets the event bus buffer size (default: 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing or any value fails
    /// [`CoreConfig::validate`].
    pub fn build(self) -> Result<CoreConfig> {
        let project_id = self.project_id.ok_or_else(|| {
            Error::Config(format!(
                "Project id is required. Use .project_id() or set {}.",
                ENV_PROJECT_ID
            ))
        })?;

        let api_key = self.api_key.ok_or_else(|| {
            Error::Config(format!(
                "API key is required. Use .api_key() or set {}.",
                ENV_API_KEY
            ))
        })?;

        let storage_bucket = self.storage_bucket.ok_or_else(|| {
            Error::Config(format!(
                "Storage bucket is required. Use .storage_bucket() or set {}.",
                ENV_STORAGE_BUCKET
            ))
        })?;

        let config = CoreConfig {
            project_id,
            api_key,
            storage_bucket,
            collection: self
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            access_token: self.access_token,
            request_timeout_secs: self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            placeholder_artwork: self
                .placeholder_artwork
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_ARTWORK.to_string()),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client: self.http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
