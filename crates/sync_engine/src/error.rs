//! Sync controller error types

use std::fmt;

use contracts::{ContractError, StreamHandle};
use thiserror::Error;

/// Controller lifecycle error
#[derive(Debug, Error)]
pub enum SyncError {
    /// Operation needs an attached master
    #[error("no master attached")]
    NotAttached,

    /// Controller is terminal
    #[error("sync controller has been torn down")]
    TornDown,

    /// A master is already attached
    #[error("master '{stream_id}' is already attached")]
    MasterAlreadyAttached { stream_id: String },

    /// Caller passed a different stream than the attached master
    #[error("stream '{actual}' is not the attached master '{expected}'")]
    MasterMismatch { expected: String, actual: String },

    /// Overlay id equals the master id
    #[error("overlay '{stream_id}' collides with the master id")]
    OverlayIsMaster { stream_id: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Rejected overlay attach
///
/// Hands the overlay back so the caller can return it to the cache.
#[derive(Error)]
#[error("overlay attach rejected: {reason}")]
pub struct AttachError {
    #[source]
    pub reason: SyncError,
    pub overlay: Box<dyn StreamHandle>,
}

impl AttachError {
    pub(crate) fn new(reason: SyncError, overlay: Box<dyn StreamHandle>) -> Self {
        Self { reason, overlay }
    }

    /// Split into the reason and the rejected overlay
    pub fn into_parts(self) -> (SyncError, Box<dyn StreamHandle>) {
        (self.reason, self.overlay)
    }
}

impl fmt::Debug for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachError")
            .field("reason", &self.reason)
            .field("overlay", &self.overlay.stream_id())
            .finish()
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SyncError>;
