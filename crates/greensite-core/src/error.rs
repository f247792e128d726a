//! Core error handling
//!
//! Provides typed errors for the sync engine with descriptive messages.
//! Remote API errors live in [`crate::remote::RemoteError`]; this module
//! wraps them together with local failures.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur in the sync core
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote document store call failed
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Encoding or decoding a remote document failed
    #[error("Codec error for attribute '{attribute}': {source}")]
    Codec {
        attribute: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local snapshot could not be read or written
    #[error("Snapshot error at '{path}': {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot file exists but cannot be parsed
    #[error("Snapshot at '{path}' is not valid JSON: {details}")]
    SnapshotFormat { path: PathBuf, details: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced media item does not exist in the content document
    #[error("Media item not found: {0}")]
    MediaNotFound(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Build a codec error with the attribute that failed to parse
    pub fn codec(attribute: impl Into<String>, source: serde_json::Error) -> Self {
        CoreError::Codec {
            attribute: attribute.into(),
            source,
        }
    }

    /// True when the underlying cause is a remote not-found
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Remote(RemoteError::NotFound { .. }))
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
