use thiserror::Error;

/// Startup failures: invalid settings or a missing host capability.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host did not provide a required bridge.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Invalid environment variable {variable}: {message}")]
    InvalidEnv { variable: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
