//! Error types for image-feed-dl
//!
//! Errors fall into three families that map onto how the pipeline isolates
//! failures:
//! - feed errors ([`Error::Network`], [`Error::Decode`]) skip a whole channel
//! - candidate errors (network or [`Error::FileSystem`] during a download) skip
//!   one image
//! - configuration errors ([`Error::Config`], [`Error::InvalidChannel`]) are
//!   reported before any work starts

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for image-feed-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for image-feed-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "channels")
        key: Option<String>,
    },

    /// Channel name failed validation
    #[error("invalid channel name: {0:?}")]
    InvalidChannel(String),

    /// Transport failure or non-success HTTP status
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Feed body could not be decoded into a listing
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Filesystem operation failed on a known path
    #[error("filesystem error at {path}: {source}")]
    FileSystem {
        /// The path the operation was acting on
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error without path context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Wrap an I/O error with the path it occurred on
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is scoped to a single channel's feed
    pub fn is_feed_error(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Decode(_))
    }
}
