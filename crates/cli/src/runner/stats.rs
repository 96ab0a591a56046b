//! Run statistics and summary output.

use std::time::Duration;

use observability::SyncStatsAggregator;

/// Statistics from a simulated run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Master video played
    pub video_id: String,

    /// Overlays attached at the end of the run
    pub overlays: Vec<String>,

    /// Display ticks delivered
    pub ticks: u64,

    /// Drift corrections reported by display ticks
    pub corrections: u64,

    /// Scripted seeks issued
    pub seeks_issued: u64,

    /// Simulated media time driven through the backend (seconds)
    pub media_elapsed: f64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Master timecode when the run stopped
    pub final_timecode: String,

    /// Master frame when the run stopped
    pub final_frame: i64,

    /// Total master frames (0 = unknown)
    pub total_frames: i64,

    /// Sync controller statistics
    pub sync: SyncStatsAggregator,
}

impl RunStats {
    /// Display ticks per wall-clock second
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Playback Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Video: {}", self.video_id);
        println!("   ├─ Overlays: {}", self.overlays.join(", "));
        println!("   ├─ Wall time: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Media time driven: {:.2}s", self.media_elapsed);
        println!("   ├─ Display ticks: {} ({:.1}/s)", self.ticks, self.tick_rate());
        println!("   ├─ Scripted seeks: {}", self.seeks_issued);
        if self.total_frames > 0 {
            println!(
                "   └─ Final position: {} (frame {}/{})",
                self.final_timecode, self.final_frame, self.total_frames
            );
        } else {
            println!(
                "   └─ Final position: {} (frame {})",
                self.final_timecode, self.final_frame
            );
        }

        println!("\n📈 Sync Controller");
        for line in self.sync.summary().to_string().lines().skip(1) {
            println!("   {}", line);
        }

        println!();
    }
}
