//! Error types for CLI operations.

use playback::PlaybackError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    ManifestNotFound { path: String },

    /// Manifest has nothing to play
    #[error("Manifest contains no videos")]
    EmptyManifest,

    /// Run arguments are inconsistent
    #[error("Invalid run arguments: {message}")]
    InvalidArguments { message: String },

    /// Playback session error
    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

impl CliError {
    pub fn manifest_not_found(path: impl Into<String>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }
}
