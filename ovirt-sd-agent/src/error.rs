//! Error types for the discovery pipeline
//!
//! Two tiers:
//! - [`ConfigError`] is startup-fatal and never seen once the loop runs
//! - everything folded into [`CycleError`] abandons the current cycle only

use std::path::PathBuf;

/// Startup configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Only URLs starting with 'https' are supported, got '{0}'")]
    InsecureScheme(String),
    #[error("Invalid engine URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("No engine password supplied")]
    MissingPassword,
    #[error("No engine user supplied")]
    MissingUser,
    #[error("Update interval must be at least one second")]
    InvalidInterval,
    #[error("Could not read CA bundle {path:?}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not load root CA certificate from {0:?}")]
    EmptyCaBundle(PathBuf),
    #[error("Could not read config file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure to retrieve the host inventory from the engine
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Engine answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    /// Raised by `InventorySource` implementations that do not talk HTTP,
    /// such as a listing read from disk or an in-memory source
    #[error("{0}")]
    Other(String),
}

/// Response body did not match the expected host listing shape
#[derive(Debug, thiserror::Error)]
#[error("Invalid host listing: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// Failure to replace the output file
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Anything that abandons a single discovery cycle
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("write failed: {0}")]
    Write(#[from] WriteError),
}

impl CycleError {
    /// Short stage name used in logs and the status endpoint
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch",
            CycleError::Decode(_) => "decode",
            CycleError::Write(_) => "write",
        }
    }
}
