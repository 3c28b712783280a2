//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux) and for integration tooling such as the catalog
//! upload scripts.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, connection pooling, retry with
//!   exponential backoff)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new());
//! let config = CoreConfig::builder()
//!     .http_client(http_client)
//!     // ...
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
