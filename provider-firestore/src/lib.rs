//! # Firestore Provider
//!
//! Implements the library's `CatalogGateway` against the Cloud Firestore REST
//! API and its `AssetResolver` against Firebase Storage.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated listing of the track collection
//! - Lenient decoding of Firestore typed values into `Track`s
//! - Merge writes (`update` with an existence precondition, `upsert`)
//! - Document creation for upload tooling
//! - `gs://` and bucket-relative path resolution to download URLs
//! - Exponential backoff for throttling and transient server errors

pub mod connector;
pub mod error;
pub mod storage;
pub mod types;

pub use connector::{FirestoreGateway, FirestoreSettings};
pub use error::{FirestoreError, Result};
pub use storage::FirebaseStorageResolver;
