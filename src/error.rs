//! Error types for image-retrieval-core
//!
//! Most pipeline failures never reach this type: per the delivery contract,
//! download failures and cache I/O failures are folded into a `(None, false)`
//! callback invocation (see [`crate::manager`]) rather than surfaced as a
//! `Result`. `Error` covers the remaining failures that have nowhere else to
//! go — the ones raised by [`crate::manager::ImageManager::new`] while
//! setting up the disk tier.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for image-retrieval-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The disk cache directory could not be created.
    #[error("failed to create disk cache directory '{path}': {source}")]
    DiskCacheInit {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by [`crate::provider::Provider::download`].
///
/// Opaque to the core: the pipeline never inspects the contents, it only
/// distinguishes success from failure. A download failure is delivered to
/// all live tokens for the key as a `None` image and is not retried by the
/// core — the client re-submits if it wants another attempt.
#[derive(Debug, Error)]
#[error("download failed: {message}")]
pub struct DownloadError {
    message: String,
}

impl DownloadError {
    /// Build a download error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for DownloadError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for DownloadError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
