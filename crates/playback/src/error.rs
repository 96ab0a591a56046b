//! Playback error types

use contracts::ContractError;
use sync_engine::SyncError;
use thiserror::Error;

/// Session and viewer error
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Seek target is not a finite time
    #[error("invalid position: {position}")]
    InvalidPosition { position: f64 },

    /// Video id is not in the manifest
    #[error("unknown video: {video_id}")]
    UnknownVideo { video_id: String },

    /// Overlay id does not belong to the selected video
    #[error("unknown overlay '{overlay_id}' for video '{video_id}'")]
    UnknownOverlay {
        video_id: String,
        overlay_id: String,
    },

    /// Age group is not used by any overlay
    #[error("unknown age group: {age_group}")]
    UnknownAgeGroup { age_group: String },

    /// Operation needs a selected video
    #[error("no video selected")]
    NoVideoSelected,

    /// Wrapped SyncError
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, PlaybackError>;
