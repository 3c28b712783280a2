//! # Library Module
//!
//! Client-side state for the shared track catalog.
//!
//! ## Overview
//!
//! This crate owns:
//! - The domain model (`Track`, `TrackPatch`, `TrackDraft`, `QueueItem`)
//! - The remote seams (`CatalogGateway`, `AssetResolver`) implemented by
//!   provider crates
//! - The `LibraryStore`: sync protocol plus local-only favorites and
//!   playlist membership
//! - Pure projections (favorites, artists, playlists, title search, queue)
//! - Consumer bindings that notify presentation code of slice changes

pub mod bindings;
pub mod error;
pub mod gateway;
pub mod models;
pub mod projections;
pub mod store;

pub use bindings::Subscription;
pub use error::{LibraryError, Result};
pub use gateway::{AssetResolver, CatalogGateway};
pub use models::{Artist, Playlist, QueueItem, Track, TrackDraft, TrackId, TrackPatch};
pub use store::{LibrarySnapshot, LibraryStatus, LibraryStore};
