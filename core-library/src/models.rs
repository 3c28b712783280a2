//! Domain models for the music library
//!
//! Catalog entries as synced from the remote document store, the patch and
//! draft shapes written back to it, and the read-only projections derived
//! from the collection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{LibraryError, Result};

/// Display name used when a track carries no artist.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Rating value marking a track as favorited.
pub const FAVORITE_RATING: i64 = 1;

// =============================================================================
// ID Types
// =============================================================================

/// Document identifier assigned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// Track
// =============================================================================

/// A shared catalog entry.
///
/// `url` is the natural key used by every local mutation. `rating` and
/// `playlist` are client-local annotations that are never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Document identifier
    pub id: TrackId,
    /// Fetchable location of the audio asset
    pub url: String,
    /// Track title (empty when absent upstream)
    pub title: String,
    /// Track artist (empty when absent upstream)
    pub artist: String,
    /// Album name
    pub album: Option<String>,
    /// Artwork URL or empty string
    pub artwork: String,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// 0 = not favorited, 1 = favorited
    pub rating: i64,
    /// Playlist names in display order
    pub playlist: Vec<String>,
}

impl Track {
    /// Creates a track with empty metadata.
    pub fn new(id: impl Into<TrackId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            artist: String::new(),
            album: None,
            artwork: String::new(),
            duration: None,
            rating: 0,
            playlist: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = artwork.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_rating(mut self, rating: i64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_playlists<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.playlist = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_favorite(&self) -> bool {
        self.rating == FAVORITE_RATING
    }

    pub fn in_playlist(&self, name: &str) -> bool {
        self.playlist.iter().any(|p| p == name)
    }

    /// Artist name used for grouping and display.
    pub fn artist_display_name(&self) -> &str {
        if self.artist.is_empty() {
            UNKNOWN_ARTIST
        } else {
            &self.artist
        }
    }

    /// Rating after a favorite toggle: 1 becomes 0, anything else becomes 1.
    pub fn toggled_rating(&self) -> i64 {
        if self.rating == FAVORITE_RATING {
            0
        } else {
            FAVORITE_RATING
        }
    }
}

// =============================================================================
// Write shapes
// =============================================================================

/// Partial field set for merge writes. Only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    pub duration: Option<f64>,
    pub rating: Option<i64>,
    pub playlist: Option<Vec<String>>,
}

impl TrackPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn rating(mut self, rating: i64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn playlist(mut self, names: Vec<String>) -> Self {
        self.playlist = Some(names);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fields for a new catalog document.
///
/// The gateway stamps `rating = 0`, an empty playlist and the creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDraft {
    pub url: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork: String,
    pub duration: Option<f64>,
}

impl TrackDraft {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            artist: String::new(),
            album: None,
            artwork: String::new(),
            duration: None,
        }
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = artwork.into();
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "url".to_string(),
                message: "Track URL cannot be empty".to_string(),
            });
        }

        if self.title.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "title".to_string(),
                message: "Track title cannot be empty".to_string(),
            });
        }

        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(LibraryError::InvalidInput {
                    field: "duration".to_string(),
                    message: format!("Duration {} is not a valid number of seconds", duration),
                });
            }
        }

        Ok(())
    }
}

/// Metadata fields of a draft as a patch. Annotations are left untouched.
impl From<&TrackDraft> for TrackPatch {
    fn from(draft: &TrackDraft) -> Self {
        Self {
            url: Some(draft.url.clone()),
            title: Some(draft.title.clone()),
            artist: Some(draft.artist.clone()),
            album: draft.album.clone(),
            artwork: Some(draft.artwork.clone()),
            duration: draft.duration,
            rating: None,
            playlist: None,
        }
    }
}

/// The subset of a track handed to the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub url: String,
    pub title: String,
    pub artist: String,
    pub artwork: String,
    pub duration: Option<f64>,
}

impl From<&Track> for QueueItem {
    fn from(track: &Track) -> Self {
        Self {
            url: track.url.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork: track.artwork.clone(),
            duration: track.duration,
        }
    }
}

// =============================================================================
// Projections
// =============================================================================

/// Tracks sharing one exact artist value.
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub name: String,
    pub tracks: Vec<Arc<Track>>,
}

/// Tracks grouped under one playlist name.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<Arc<Track>>,
    /// Artwork of the first member, or the placeholder when that is empty
    pub artwork_preview: String,
}

/// Compares two track slices by slot identity rather than by value.
pub fn same_slots(a: &[Arc<Track>], b: &[Arc<Track>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}
