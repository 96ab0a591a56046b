//! Playback configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

/// Nominal frame rate of every recording
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Maximum overlay divergence before a forced correction (seconds)
pub const DEFAULT_DRIFT_THRESHOLD_S: f64 = 0.1;

/// Display refresh used to drive correction ticks when the host has none
pub const DEFAULT_DISPLAY_HZ: u32 = 60;

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Frame rate shared by master and overlays
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Drift threshold in seconds
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold_s: f64,

    /// Start playback right after a new master is selected
    #[serde(default = "default_autoplay")]
    pub autoplay_on_select: bool,

    /// Display tick rate used by hosts without their own refresh callback
    #[serde(default = "default_display_hz")]
    pub display_hz: u32,
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

fn default_drift_threshold() -> f64 {
    DEFAULT_DRIFT_THRESHOLD_S
}

fn default_autoplay() -> bool {
    true
}

fn default_display_hz() -> u32 {
    DEFAULT_DISPLAY_HZ
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            drift_threshold_s: DEFAULT_DRIFT_THRESHOLD_S,
            autoplay_on_select: true,
            display_hz: DEFAULT_DISPLAY_HZ,
        }
    }
}
