//! SyncStats - Sync Controller output
//!
//! Counters describing how much work the controller did to keep overlays locked.

use serde::{Deserialize, Serialize};

use crate::StreamId;

/// Lifecycle state of a sync controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// No master attached
    Idle,
    /// Master attached, overlays may come and go
    Attached,
    /// Terminal; all listeners released
    TornDown,
}

/// Per-overlay synchronization status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStatus {
    /// Tracking the master
    Synced,
    /// Errored; skipped by correction ticks until it reports `Loaded`
    Unresolved,
}

/// Sync statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Master events handled
    pub events_processed: u64,

    /// Hard position snaps issued by discrete events (attach, seek, rate change, load)
    pub snaps: u64,

    /// Threshold-triggered corrections issued by the continuous loop
    pub drift_corrections: u64,

    /// Correction loop ticks that inspected overlays
    pub correction_ticks: u64,

    /// Overlay rate writes
    pub rate_updates: u64,

    /// Rejected play commands
    pub play_failures: u64,

    /// Rejected seek commands
    pub seek_failures: u64,

    /// Largest divergence corrected by the loop (seconds)
    pub max_corrected_drift: f64,

    /// Overlays currently skipped by correction
    pub unresolved: Vec<StreamId>,
}

impl SyncStats {
    /// Record a loop correction of `drift` seconds
    pub fn record_drift_correction(&mut self, drift: f64) {
        self.drift_corrections += 1;
        self.max_corrected_drift = self.max_corrected_drift.max(drift.abs());
    }
}
