//! # Host Bridge Traits
//!
//! Capabilities the library core needs from its host, expressed as traits so
//! each platform can supply its own implementation.
//!
//! | Trait | Used by | Desktop implementation |
//! |-------|---------|------------------------|
//! | [`HttpClient`] | Firestore gateway, storage resolver | `bridge_desktop::ReqwestHttpClient` |
//! | [`LoggerSink`] | `core_runtime::logging` | [`StderrSink`] |
//! | [`Clock`] | document `createdAt` stamps | [`SystemClock`] |
//!
//! All traits are `Send + Sync` so one implementation can be shared across
//! tasks behind an `Arc`. Failures are reported as [`BridgeError`]; a
//! non-2xx HTTP status is a response, not an error.

pub mod error;
pub mod http;
pub mod log;
pub mod time;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use log::{LogEntry, LogLevel, LoggerSink, StderrSink};
pub use time::{Clock, FixedClock, SystemClock};
