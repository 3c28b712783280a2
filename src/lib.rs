//! Music library client core.
//!
//! Feature-flag aggregation crate. Host applications depend on
//! `mlc-workspace` and pick a profile instead of wiring each crate:
//!
//! - `desktop-shims` (default): the full [`LibraryService`] with the
//!   reqwest-backed HTTP client.
//! - `firestore`: the service with the Firestore gateway, HTTP client
//!   injected by the host.
//! - `library-only`: just the store, projections and gateway traits, for
//!   hosts that bring their own catalog backend.

#[cfg(any(feature = "desktop-shims", feature = "firestore"))]
pub use core_service::{CoreError, LibraryService};

#[cfg(feature = "library-only")]
pub use core_library as library;
