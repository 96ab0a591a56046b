//! Continuous drift correction loop state.
//!
//! The loop has no timer of its own: the host calls the controller once per
//! display frame and the controller consults this state to decide whether to
//! inspect overlays.

use contracts::UNIT_RATE;

/// Cancellable per-display-frame correction task
#[derive(Debug, Clone, Default)]
pub struct CorrectionLoop {
    running: bool,
    starts: u64,
}

impl CorrectionLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the running flag. Returns `true` if the loop was not already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.starts += 1;
        true
    }

    /// Clear the running flag. Idempotent; returns whether the loop was running.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of times the loop transitioned from stopped to running
    pub fn starts(&self) -> u64 {
        self.starts
    }
}

/// Whether continuous correction is wanted for the given master state
///
/// At unit rate only discrete events correct.
pub fn correction_wanted(master_playing: bool, master_rate: f64, overlay_count: usize) -> bool {
    master_playing && master_rate != UNIT_RATE && overlay_count > 0
}

/// Signed divergence of an overlay from the master (seconds)
pub fn drift(overlay_position: f64, master_position: f64) -> f64 {
    overlay_position - master_position
}

/// Whether a divergence must be corrected. The threshold itself is tolerated.
pub fn exceeds_threshold(drift: f64, threshold: f64) -> bool {
    drift.abs() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let mut lp = CorrectionLoop::new();
        assert!(!lp.cancel());
        assert!(lp.start());
        assert!(!lp.start());
        assert!(lp.cancel());
        assert!(!lp.cancel());
        assert!(!lp.is_running());
        assert_eq!(lp.starts(), 1);
    }

    #[test]
    fn test_correction_wanted() {
        assert!(correction_wanted(true, 0.5, 1));
        assert!(correction_wanted(true, 2.0, 3));
        assert!(!correction_wanted(true, 1.0, 1));
        assert!(!correction_wanted(false, 0.5, 1));
        assert!(!correction_wanted(true, 0.5, 0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(!exceeds_threshold(drift(10.1, 10.0) - 1e-9, 0.1));
        assert!(exceeds_threshold(drift(10.0, 10.25), 0.1));
        assert!(!exceeds_threshold(0.0, 0.1));
    }
}
