//! # Event Bus System
//!
//! Provides an event-driven side channel for the library core using
//! `tokio::sync::broadcast`. The library store publishes a typed event for
//! every state transition so hosts can drive analytics, toasts or debug
//! overlays without registering a full state listener.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for sync and library changes
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ Library Store ├──────────────>│ EventBus  ├─────────────────>│ Subscriber │
//! └───────────────┘               │ (broadcast│                  └────────────┘
//!                                 │  channel) │     subscribe    ┌────────────┐
//!                                 │           ├─────────────────>│ Subscriber │
//!                                 └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! let delivered = event_bus.emit(CoreEvent::Sync(SyncEvent::Started {
//!     sync_id: "sync-1".to_string(),
//!     trigger: "refresh".to_string(),
//! }));
//!
//! assert_eq!(delivered, 1);
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Event Types
//!
//! ### Sync Events
//! - `Started`: A catalog sync was triggered
//! - `Completed`: The catalog was replaced with the remote result
//! - `Failed`: The remote fetch failed; previous tracks were kept
//!
//! ### Library Events
//! - `FavoriteToggled`: A track's local rating flipped
//! - `PlaylistTrackAdded`: A track was added to a local playlist
//!
//! ## Error Handling
//!
//! `emit` never fails; with no subscriber listening the event is dropped. Slow subscribers receive `RecvError::Lagged(n)`
//! and may continue; `RecvError::Closed` signals shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Catalog sync lifecycle events
    Sync(SyncEvent),
    /// Local library mutation events
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted while the library store syncs the remote catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Sync call started; `is_loading` is now true.
    Started {
        /// Identifier correlating the events of one sync call.
        sync_id: String,
        /// What triggered the call (e.g. "sync", "refresh").
        trigger: String,
    },
    /// Remote fetch succeeded and the collection was replaced.
    Completed {
        /// The sync call identifier.
        sync_id: String,
        /// Number of tracks now in the collection.
        track_count: u64,
        /// Wall time of the call in milliseconds.
        duration_ms: u64,
    },
    /// Remote fetch failed; the previous collection was kept.
    Failed {
        /// The sync call identifier.
        sync_id: String,
        /// Human-readable error message (also stored in the state's `error`).
        message: String,
        /// Number of tracks still in the collection.
        retained_track_count: u64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Catalog sync started",
            SyncEvent::Completed { .. } => "Catalog sync completed",
            SyncEvent::Failed { .. } => "Catalog sync failed",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to local-only library annotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A track's favorite rating flipped.
    FavoriteToggled {
        /// Document identifier of the track.
        track_id: String,
        /// Natural key used for the lookup.
        url: String,
        /// Rating after the toggle (0 or 1).
        rating: i64,
    },
    /// A track was appended to a local playlist.
    PlaylistTrackAdded {
        /// Document identifier of the track.
        track_id: String,
        /// Natural key used for the lookup.
        url: String,
        /// Playlist name.
        playlist: String,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::FavoriteToggled { .. } => "Favorite toggled",
            LibraryEvent::PlaylistTrackAdded { .. } => "Track added to playlist",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel carrying [`CoreEvent`]s.
///
/// Clones publish into the same channel. Each subscriber buffers up to
/// `capacity` events; a subscriber that falls further behind gets
/// `RecvError::Lagged` and then continues with the newest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish `event` and return how many subscribers will see it.
    ///
    /// Publishing with nobody listening delivers to zero subscribers.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Raw receiver. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Unfiltered [`EventStream`] over a fresh subscription.
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(16);
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscription that skips events rejected by its filters.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let event_bus = EventBus::new(16);
/// let failures = event_bus
///     .stream()
///     .filter(|event| matches!(event, CoreEvent::Sync(_)))
///     .min_severity(EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filters: Vec<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filters: Vec::new(),
        }
    }

    /// Keep only events for which `predicate` holds. Filters accumulate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Keep only events at or above `severity`.
    pub fn min_severity(self, severity: EventSeverity) -> Self {
        self.filter(move |event| event.severity() >= severity)
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filters.iter().all(|filter| filter(event))
    }

    /// Next accepted event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if `n` events were dropped for this subscriber,
    /// `RecvError::Closed` once every publisher is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event already buffered, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filters", &self.filters.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Started {
            sync_id: id.to_string(),
            trigger: "sync".to_string(),
        })
    }

    fn favorite(url: &str) -> CoreEvent {
        CoreEvent::Library(LibraryEvent::FavoriteToggled {
            track_id: "doc-1".to_string(),
            url: url.to_string(),
            rating: 1,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(10);
        assert_eq!(bus.emit(started("sync-1")), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = started("sync-1");
        assert_eq!(bus.emit(event.clone()), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(started("sync-1"));
        let wanted = favorite("https://cdn.example.com/a.mp3");
        bus.emit(wanted.clone());

        assert_eq!(stream.recv().await.unwrap(), wanted);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&format!("sync-{}", i)));
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            sync_id: "sync-1".to_string(),
            message: "permission denied".to_string(),
            retained_track_count: 4,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let completed = CoreEvent::Sync(SyncEvent::Completed {
            sync_id: "sync-1".to_string(),
            track_count: 12,
            duration_ms: 80,
        });
        assert_eq!(completed.severity(), EventSeverity::Info);

        assert_eq!(favorite("u").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(started("sync-1").description(), "Catalog sync started");
        assert_eq!(favorite("u").description(), "Favorite toggled");
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Library(LibraryEvent::PlaylistTrackAdded {
            track_id: "doc-7".to_string(),
            url: "https://cdn.example.com/amazing-grace.mp3".to_string(),
            playlist: "Worship".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Library\""));
        assert!(json.contains("\"event\":\"PlaylistTrackAdded\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_try_recv_skips_filtered_events() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Sync(_)));

        bus.emit(favorite("u"));
        bus.emit(started("sync-2"));

        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, started("sync-2"));
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_min_severity_and_filters_combine() {
        let bus = EventBus::new(10);
        let mut stream = bus
            .stream()
            .filter(|event| matches!(event, CoreEvent::Sync(_)))
            .min_severity(EventSeverity::Info);

        let completed = CoreEvent::Sync(SyncEvent::Completed {
            sync_id: "sync-1".to_string(),
            track_count: 3,
            duration_ms: 12,
        });
        bus.emit(started("sync-1"));
        bus.emit(favorite("u"));
        bus.emit(completed.clone());

        assert_eq!(stream.try_recv().unwrap().unwrap(), completed);
        assert!(stream.try_recv().is_none());
    }
}
