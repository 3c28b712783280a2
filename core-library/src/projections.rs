//! Derived views over the track collection
//!
//! Every function here is pure and recomputed on each read. The group-by
//! projections fold left to right: the first track that mentions a group fixes
//! the group's position, later tracks only append members.

use std::sync::Arc;

use crate::models::{Artist, Playlist, QueueItem, Track};

/// Tracks with `rating == 1`, in collection order.
pub fn favorites(tracks: &[Arc<Track>]) -> Vec<Arc<Track>> {
    tracks
        .iter()
        .filter(|track| track.is_favorite())
        .cloned()
        .collect()
}

/// Tracks grouped by exact artist value, in first-appearance order.
///
/// The group of tracks without an artist is named `"Unknown"`; it stays
/// separate from tracks whose artist is literally `"Unknown"`.
pub fn artists(tracks: &[Arc<Track>]) -> Vec<Artist> {
    tracks.iter().fold(Vec::new(), |mut groups: Vec<Artist>, track| {
        let existing = groups
            .iter_mut()
            .find(|group| group.tracks[0].artist == track.artist);
        match existing {
            Some(group) => group.tracks.push(Arc::clone(track)),
            None => groups.push(Artist {
                name: track.artist_display_name().to_string(),
                tracks: vec![Arc::clone(track)],
            }),
        }
        groups
    })
}

/// Tracks grouped by playlist name, in first-appearance order.
///
/// The preview artwork is taken from the track that created the group and is
/// not updated by later members; `placeholder` stands in for empty artwork.
pub fn playlists(tracks: &[Arc<Track>], placeholder: &str) -> Vec<Playlist> {
    let mut groups: Vec<Playlist> = Vec::new();

    for track in tracks {
        for name in &track.playlist {
            match groups.iter_mut().find(|group| &group.name == name) {
                Some(group) => group.tracks.push(Arc::clone(track)),
                None => {
                    let artwork_preview = if track.artwork.is_empty() {
                        placeholder.to_string()
                    } else {
                        track.artwork.clone()
                    };
                    groups.push(Playlist {
                        name: name.clone(),
                        tracks: vec![Arc::clone(track)],
                        artwork_preview,
                    });
                }
            }
        }
    }

    groups
}

/// Case-insensitive substring match on title. An empty query matches all.
pub fn search_by_title(tracks: &[Arc<Track>], query: &str) -> Vec<Arc<Track>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tracks.to_vec();
    }

    tracks
        .iter()
        .filter(|track| track.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Playback queue for the given tracks, preserving order.
pub fn build_queue(tracks: &[Arc<Track>]) -> Vec<QueueItem> {
    tracks.iter().map(|track| QueueItem::from(track.as_ref())).collect()
}
