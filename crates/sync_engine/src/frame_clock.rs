//! Frame clock: time <-> frame conversion at a fixed nominal rate.

use contracts::DEFAULT_FRAME_RATE;

/// Guards `floor` against values like 1.9999999999 produced by `t % 1.0 * fps`
const FLOOR_EPSILON: f64 = 1e-9;

/// Fixed-rate frame clock shared by a master and all of its overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    fps: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

impl FrameClock {
    /// Create a clock. A zero rate falls back to the default.
    pub fn new(fps: u32) -> Self {
        let fps = if fps == 0 { DEFAULT_FRAME_RATE } else { fps };
        Self { fps }
    }

    /// Nominal frame rate
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Duration of one frame in seconds
    pub fn frame_duration(&self) -> f64 {
        1.0 / f64::from(self.fps)
    }

    /// Start time of `frame`
    pub fn frame_to_time(&self, frame: i64) -> f64 {
        frame as f64 / f64::from(self.fps)
    }

    /// Nearest frame index for media time `t`
    pub fn time_to_frame(&self, t: f64) -> i64 {
        (t * f64::from(self.fps)).round() as i64
    }

    /// Snap `t` onto the nearest frame boundary
    pub fn snap(&self, t: f64) -> f64 {
        self.frame_to_time(self.time_to_frame(t))
    }

    /// Total frames in a stream of `duration` seconds
    pub fn total_frames(&self, duration: f64) -> i64 {
        if duration.is_finite() && duration > 0.0 {
            self.time_to_frame(duration)
        } else {
            0
        }
    }

    /// Format `t` as `MM:SS:FF` (FF = frame within the second)
    pub fn format_timecode(&self, t: f64) -> String {
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let minutes = (t / 60.0).floor() as u64;
        let seconds = (t % 60.0).floor() as u64;
        let frames = ((t % 1.0) * f64::from(self.fps) + FLOOR_EPSILON).floor() as u64;
        let frames = frames.min(u64::from(self.fps) - 1);
        format!("{minutes:02}:{seconds:02}:{frames:02}")
    }
}
