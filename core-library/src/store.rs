//! # Library Store
//!
//! The process-wide state container for the synced catalog.
//!
//! ## Overview
//!
//! `LibraryStore` owns the track collection plus the loading and error status
//! of the last sync. Each transition is a single replacement of the state
//! under a short synchronous lock; the lock is never held across an `.await`
//! and listeners run only after it is released.
//!
//! The collection is stored as `Arc<Vec<Arc<Track>>>`. A local mutation
//! replaces exactly one slot, so every other track stays pointer-identical and
//! bindings can detect changes by identity.
//!
//! ## Sync protocol
//!
//! ```text
//! sync_from_remote()
//!   ├─ is_loading = true, error = None        ──> notify
//!   ├─ gateway.fetch_all().await
//!   ├─ Ok(tracks)  → tracks replaced, error = None
//!   ├─ Err(e)      → tracks kept,     error = Some(e)
//!   └─ is_loading = false                     ──> notify
//! ```
//!
//! Overlapping syncs are not deduplicated: whichever call completes last
//! determines every field.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use core_runtime::config::DEFAULT_PLACEHOLDER_ARTWORK;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::bindings::{ListenerRegistry, Subscription};
use crate::gateway::CatalogGateway;
use crate::models::{Artist, Playlist, QueueItem, Track};
use crate::projections;

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    /// Synced collection, replaced wholesale on each successful sync
    pub tracks: Arc<Vec<Arc<Track>>>,
    /// True only while a sync is in flight
    pub is_loading: bool,
    /// Message of the last sync failure
    pub error: Option<String>,
    /// Monotonic counter bumped on every transition
    pub version: u64,
}

impl LibrarySnapshot {
    pub fn favorites(&self) -> Vec<Arc<Track>> {
        projections::favorites(&self.tracks)
    }

    pub fn artists(&self) -> Vec<Artist> {
        projections::artists(&self.tracks)
    }

    pub fn playlists(&self, placeholder: &str) -> Vec<Playlist> {
        projections::playlists(&self.tracks, placeholder)
    }

    pub fn find_by_url(&self, url: &str) -> Option<Arc<Track>> {
        self.tracks.iter().find(|track| track.url == url).cloned()
    }
}

/// Loading and error status, the slice bound by `bind_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl From<&LibrarySnapshot> for LibraryStatus {
    fn from(snapshot: &LibrarySnapshot) -> Self {
        Self {
            is_loading: snapshot.is_loading,
            error: snapshot.error.clone(),
        }
    }
}

/// Shared library state and the operations that mutate it.
pub struct LibraryStore {
    gateway: Arc<dyn CatalogGateway>,
    state: Mutex<LibrarySnapshot>,
    listeners: Arc<ListenerRegistry>,
    event_bus: Option<EventBus>,
    placeholder_artwork: String,
}

impl LibraryStore {
    /// Creates an empty store backed by `gateway`.
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(LibrarySnapshot::default()),
            listeners: Arc::new(ListenerRegistry::default()),
            event_bus: None,
            placeholder_artwork: DEFAULT_PLACEHOLDER_ARTWORK.to_string(),
        }
    }

    /// Publishes a `CoreEvent` for every transition on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Artwork used for playlist previews whose first member has none.
    pub fn with_placeholder_artwork(mut self, uri: impl Into<String>) -> Self {
        self.placeholder_artwork = uri.into();
        self
    }

    pub fn placeholder_artwork(&self) -> &str {
        &self.placeholder_artwork
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    /// Replaces the collection with the remote catalog.
    ///
    /// Failures are recorded in the state's `error` and never returned.
    pub async fn sync_from_remote(&self) {
        self.run_sync("sync").await;
    }

    /// Pull-to-refresh entry point; same protocol as [`sync_from_remote`].
    ///
    /// [`sync_from_remote`]: LibraryStore::sync_from_remote
    pub async fn refresh(&self) {
        self.run_sync("refresh").await;
    }

    #[instrument(skip(self), fields(sync_id = tracing::field::Empty))]
    async fn run_sync(&self, trigger: &'static str) {
        let sync_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("sync_id", sync_id.as_str());
        let started_at = Instant::now();

        self.transition(|state| {
            state.is_loading = true;
            state.error = None;
        });
        self.emit(CoreEvent::Sync(SyncEvent::Started {
            sync_id: sync_id.clone(),
            trigger: trigger.to_string(),
        }));
        info!(trigger, "Catalog sync started");

        let result = self.gateway.fetch_all().await;
        let duration_ms = started_at.elapsed().as_millis() as u64;

        match result {
            Ok(tracks) => {
                let collection: Vec<Arc<Track>> = tracks.into_iter().map(Arc::new).collect();
                let track_count = collection.len() as u64;

                self.transition(move |state| {
                    state.tracks = Arc::new(collection);
                    state.error = None;
                    state.is_loading = false;
                });

                info!(track_count, duration_ms, "Catalog sync completed");
                self.emit(CoreEvent::Sync(SyncEvent::Completed {
                    sync_id,
                    track_count,
                    duration_ms,
                }));
            }
            Err(err) => {
                let message = err.to_string();
                error!(error = %message, duration_ms, "Catalog sync failed");

                let stored = message.clone();
                let snapshot = self.transition(move |state| {
                    state.error = Some(stored);
                    state.is_loading = false;
                });

                self.emit(CoreEvent::Sync(SyncEvent::Failed {
                    sync_id,
                    message,
                    retained_track_count: snapshot.tracks.len() as u64,
                }));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Local mutations
    // -------------------------------------------------------------------------

    /// Flips the favorite rating of the first track with `track.url`.
    ///
    /// Returns the new rating, or `None` if no track has that URL. The change
    /// is local only.
    pub fn toggle_favorite(&self, track: &Track) -> Option<i64> {
        let updated = self.replace_slot(&track.url, |current| {
            let mut next = current.clone();
            next.rating = current.toggled_rating();
            Some(next)
        })?;

        debug!(url = %track.url, rating = updated.rating, "Favorite toggled");
        self.emit(CoreEvent::Library(LibraryEvent::FavoriteToggled {
            track_id: updated.id.to_string(),
            url: updated.url.clone(),
            rating: updated.rating,
        }));

        Some(updated.rating)
    }

    /// Appends `playlist` to the first track with `track.url`.
    ///
    /// Returns `false` when no track has that URL or it is already in the
    /// playlist. Names are taken verbatim. The change is local only.
    pub fn add_to_playlist(&self, track: &Track, playlist: &str) -> bool {
        let Some(updated) = self.replace_slot(&track.url, |current| {
            if current.in_playlist(playlist) {
                return None;
            }
            let mut next = current.clone();
            next.playlist.push(playlist.to_string());
            Some(next)
        }) else {
            return false;
        };

        debug!(url = %track.url, playlist, "Track added to playlist");
        self.emit(CoreEvent::Library(LibraryEvent::PlaylistTrackAdded {
            track_id: updated.id.to_string(),
            url: updated.url.clone(),
            playlist: playlist.to_string(),
        }));

        true
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.lock_state().clone()
    }

    pub fn tracks(&self) -> Arc<Vec<Arc<Track>>> {
        Arc::clone(&self.lock_state().tracks)
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn status(&self) -> LibraryStatus {
        LibraryStatus::from(&*self.lock_state())
    }

    /// First track whose URL equals `url`.
    pub fn find_by_url(&self, url: &str) -> Option<Arc<Track>> {
        self.lock_state().find_by_url(url)
    }

    pub fn favorites(&self) -> Vec<Arc<Track>> {
        projections::favorites(&self.tracks())
    }

    pub fn artists(&self) -> Vec<Artist> {
        projections::artists(&self.tracks())
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        projections::playlists(&self.tracks(), &self.placeholder_artwork)
    }

    pub fn search(&self, query: &str) -> Vec<Arc<Track>> {
        projections::search_by_title(&self.tracks(), query)
    }

    /// Queue for the whole collection, in collection order.
    pub fn queue(&self) -> Vec<QueueItem> {
        projections::build_queue(&self.tracks())
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Registers a listener invoked with the new snapshot after every
    /// transition. Dropping the returned handle unregisters it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LibrarySnapshot) + Send + Sync + 'static,
    {
        self.listeners.register(Arc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn lock_state(&self) -> MutexGuard<'_, LibrarySnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `update` under the lock, then notifies with the result.
    fn transition<F>(&self, update: F) -> LibrarySnapshot
    where
        F: FnOnce(&mut LibrarySnapshot),
    {
        let snapshot = {
            let mut state = self.lock_state();
            update(&mut *state);
            state.version += 1;
            state.clone()
        };
        self.listeners.notify(&snapshot);
        snapshot
    }

    /// Replaces the first slot with a matching URL by `rebuild`'s result.
    ///
    /// Nothing changes (and nobody is notified) when no slot matches or
    /// `rebuild` returns `None`.
    fn replace_slot<F>(&self, url: &str, rebuild: F) -> Option<Arc<Track>>
    where
        F: FnOnce(&Track) -> Option<Track>,
    {
        let (updated, snapshot) = {
            let mut state = self.lock_state();
            let index = state.tracks.iter().position(|track| track.url == url)?;
            let updated = Arc::new(rebuild(&state.tracks[index])?);

            let mut tracks = Vec::clone(&state.tracks);
            tracks[index] = Arc::clone(&updated);
            state.tracks = Arc::new(tracks);
            state.version += 1;
            (updated, state.clone())
        };

        self.listeners.notify(&snapshot);
        Some(updated)
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("LibraryStore")
            .field("track_count", &state.tracks.len())
            .field("is_loading", &state.is_loading)
            .field("error", &state.error)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
