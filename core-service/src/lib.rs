//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] and host-provided bridges into
//! one [`LibraryService`]: the catalog gateway, the event bus and the shared
//! [`LibraryStore`]. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) so no HTTP client has to be injected.
//! The `firestore` feature adds [`LibraryService::bootstrap`], which builds the
//! Firestore gateway and Firebase Storage resolver from the configuration.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_library::{CatalogGateway, LibraryStore, TrackDraft, TrackId, TrackPatch};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, instrument};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::ReqwestHttpClient;

#[cfg(feature = "firestore")]
use provider_firestore::{FirebaseStorageResolver, FirestoreGateway, FirestoreSettings};

/// Primary façade exposed to host applications.
///
/// Owns the single [`LibraryStore`] of the process. Clones share the store,
/// the gateway and the event bus.
#[derive(Clone)]
pub struct LibraryService {
    config: Arc<CoreConfig>,
    gateway: Arc<dyn CatalogGateway>,
    store: Arc<LibraryStore>,
    events: EventBus,
}

impl LibraryService {
    /// Assemble a service around an explicit gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] if the configuration is invalid.
    pub fn new(config: CoreConfig, gateway: Arc<dyn CatalogGateway>) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let store = LibraryStore::new(Arc::clone(&gateway))
            .with_event_bus(events.clone())
            .with_placeholder_artwork(config.placeholder_artwork.clone());

        Ok(Self {
            config: Arc::new(config),
            gateway,
            store: Arc::new(store),
            events,
        })
    }

    /// Build the Firestore-backed service described by `config`.
    ///
    /// ```ignore
    /// use core_runtime::config::CoreConfig;
    /// use core_service::LibraryService;
    ///
    /// let config = CoreConfig::builder()
    ///     .project_id("music-app")
    ///     .api_key(api_key)
    ///     .storage_bucket("music-app.appspot.com")
    ///     .build()?;
    ///
    /// let service = LibraryService::bootstrap(config)?;
    /// service.sync().await;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] if the configuration is invalid or no
    /// HTTP client is available.
    #[cfg(feature = "firestore")]
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let http_client = config.resolve_http_client()?;

        let resolver = FirebaseStorageResolver::from_config(Arc::clone(&http_client), &config);
        let gateway = FirestoreGateway::new(http_client, FirestoreSettings::from_config(&config))
            .with_resolver(Arc::new(resolver));

        info!(
            project_id = %config.project_id,
            collection = %config.collection,
            "Library service bootstrapped"
        );
        Self::new(config, Arc::new(gateway))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The shared store. Hand clones of this `Arc` to presentation code.
    pub fn store(&self) -> Arc<LibraryStore> {
        Arc::clone(&self.store)
    }

    pub fn gateway(&self) -> Arc<dyn CatalogGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to sync and library events.
    pub fn subscribe_events(&self) -> EventStream {
        self.events.stream()
    }

    /// Pull the remote catalog into the store. Failures land in the store's
    /// `error` field.
    pub async fn sync(&self) {
        self.store.sync_from_remote().await;
    }

    /// Id of the first catalog document whose `url` matches.
    pub async fn find_track_id(&self, url: &str) -> Option<TrackId> {
        self.gateway.find_id_by_url(url).await
    }

    /// Add a new document to the shared catalog.
    ///
    /// The store is not touched; the track appears after the next sync.
    #[instrument(skip(self, draft), fields(url = %draft.url))]
    pub async fn create_track(&self, draft: &TrackDraft) -> Result<TrackId> {
        draft.validate()?;
        let id = self.gateway.create(draft).await?;
        info!(id = %id, "Track added to catalog");
        Ok(id)
    }

    /// Merge `patch` into an existing catalog document.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn update_track(&self, id: &TrackId, patch: &TrackPatch) -> Result<()> {
        self.gateway.update(id, patch).await?;
        Ok(())
    }

    /// Merge `patch` into a catalog document, creating it if missing.
    #[instrument(skip(self, patch), fields(id = %id))]
    pub async fn upsert_track(&self, id: &TrackId, patch: &TrackPatch) -> Result<()> {
        self.gateway.upsert(id, patch).await?;
        Ok(())
    }

    /// Update the document with the given `url`, or create it from `draft`.
    ///
    /// Upload tooling uses this to re-run imports without duplicating
    /// catalog entries.
    #[instrument(skip(self, draft), fields(url = %draft.url))]
    pub async fn publish_track(&self, draft: &TrackDraft) -> Result<TrackId> {
        draft.validate()?;

        match self.gateway.find_id_by_url(&draft.url).await {
            Some(id) => {
                self.gateway.update(&id, &TrackPatch::from(draft)).await?;
                info!(id = %id, "Existing catalog entry updated");
                Ok(id)
            }
            None => self.create_track(draft).await,
        }
    }
}
