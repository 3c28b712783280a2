//! # Core Runtime
//!
//! Shared plumbing for the library core:
//! - [`config`]: validated `CoreConfig` with builder and environment loading
//! - [`logging`]: `tracing-subscriber` setup, host log forwarding, redaction
//! - [`events`]: broadcast bus for sync and library events

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
