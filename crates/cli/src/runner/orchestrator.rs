//! Runner - drives a viewer over the simulated backend.
//!
//! The host side of a playback session: a display tick advances every
//! simulated decoder, pumps stream events and runs the correction loop.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{MediaManifest, OverlayStatus};
use media_factory::{SimulatedBackend, SimulatedStreamConfig};
use observability::{
    record_display_tick, record_drift_sample, record_sync_stats, SyncStatsAggregator,
};
use playback::{PlaybackError, PlaybackSession, Viewer};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::RunStats;
use crate::error::CliError;

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Loaded manifest
    pub manifest: MediaManifest,

    /// Master video to select
    pub video_id: String,

    /// Overlays to attach (empty = every overlay shown for the age group)
    pub overlay_ids: Vec<String>,

    /// Age group filter
    pub age_group: Option<String>,

    /// Playback rate after selection
    pub rate: f64,

    /// Media seconds to simulate
    pub duration_s: f64,

    /// Seek targets, spread evenly over the run
    pub seeks: Vec<f64>,

    /// Frames to step once the run ends
    pub step_frames: Option<i64>,

    /// Media seconds per wall-clock second
    pub speed: f64,

    /// Display tick rate
    pub display_hz: u32,

    /// Recording length of every simulated stream
    pub media_duration_s: f64,

    /// Overlay decoder clock skew
    pub overlay_skew: f64,

    /// Load latency of every stream
    pub load_delay_s: f64,

    /// Loop every stream at its end
    pub looping: bool,

    /// Streams whose load fails
    pub fail_load: Vec<String>,

    /// Streams whose play() is refused
    pub reject_play: Vec<String>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Simulated playback runner
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run to completion
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let backend = self.build_backend();
        let mut viewer = Viewer::new(self.config.manifest.clone(), backend.clone());

        let failed = viewer.cache().failed_ids();
        if !failed.is_empty() {
            warn!(failed = ?failed, "Some streams failed to preload");
        }

        self.prepare(&mut viewer)
            .context("Failed to prepare playback session")?;

        let mut stats = RunStats {
            video_id: self.config.video_id.clone(),
            ..Default::default()
        };

        info!(
            display_hz = self.config.display_hz,
            speed = self.config.speed,
            duration_s = self.config.duration_s,
            "Playback running"
        );

        let drive = self.drive(&mut viewer, &backend, &mut stats);
        let outcome = if let Some(timeout) = self.config.timeout {
            match tokio::time::timeout(timeout, drive).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Run timed out");
                    Ok(())
                }
            }
        } else {
            drive.await
        };
        outcome.context("Playback run failed")?;

        if let Some(frames) = self.config.step_frames {
            if let Some(session) = viewer.session_mut() {
                let frame = session.step_frame(frames)?;
                session.pump();
                info!(delta = frames, frame, "Stepped");
            }
        }

        if let Some(session) = viewer.session() {
            stats.final_timecode = session.timecode();
            stats.final_frame = session.current_frame();
            stats.total_frames = session.total_frames();
        }
        stats.overlays = viewer
            .active_overlays()
            .iter()
            .map(ToString::to_string)
            .collect();

        for session_stats in viewer.session_stats() {
            record_sync_stats(&session_stats);
            stats.sync.update(&session_stats);
        }

        info!("Closing viewer...");
        viewer.close();

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            ticks = stats.ticks,
            corrections = stats.corrections,
            "Run complete"
        );

        Ok(stats)
    }

    /// Simulated backend with per-stream behavior from the run config
    fn build_backend(&self) -> SimulatedBackend {
        let config = &self.config;
        let defaults = SimulatedStreamConfig {
            duration_s: Some(config.media_duration_s),
            load_delay_s: config.load_delay_s,
            ..Default::default()
        };
        let backend = SimulatedBackend::with_defaults(defaults.clone());

        for (stream_id, _) in config.manifest.resources() {
            let is_master = config.manifest.video(&stream_id).is_some();
            let stream_config = SimulatedStreamConfig {
                fail_load: config.fail_load.iter().any(|id| id == stream_id.as_str()),
                reject_play: config.reject_play.iter().any(|id| id == stream_id.as_str()),
                looping: config.looping,
                clock_skew: if is_master { 1.0 } else { config.overlay_skew },
                ..defaults.clone()
            };
            backend.configure(stream_id, stream_config);
        }

        let resources = config.manifest.resources();
        for id in config.fail_load.iter().chain(&config.reject_play) {
            if !resources.iter().any(|(stream_id, _)| stream_id == id.as_str()) {
                warn!(stream_id = %id, "Failure injection names an unknown stream");
            }
        }

        backend
    }

    /// Select the video, apply the age filter, attach overlays and set the rate
    fn prepare(&self, viewer: &mut Viewer<SimulatedBackend>) -> Result<(), CliError> {
        let config = &self.config;

        viewer.select_video(&config.video_id)?;
        if let Some(group) = &config.age_group {
            viewer.set_age_group(Some(group.as_str()))?;
        }

        let mut wanted: Vec<String> = Vec::new();
        let requested: Vec<String> = if config.overlay_ids.is_empty() {
            viewer
                .available_overlays()
                .iter()
                .map(|o| o.id.to_string())
                .collect()
        } else {
            config.overlay_ids.clone()
        };
        for id in requested {
            if !wanted.contains(&id) {
                wanted.push(id);
            }
        }

        for id in &wanted {
            viewer.toggle_overlay(id)?;
        }
        info!(overlays = ?wanted, "Overlays attached");

        let Some(session) = viewer.session_mut() else {
            return Err(PlaybackError::NoVideoSelected.into());
        };

        if (config.rate - 1.0).abs() > f64::EPSILON {
            session.set_rate(config.rate)?;
        }
        if !session.is_playing() {
            if let Err(e) = session.play() {
                warn!(error = %e, "Master refused to play");
            }
        }

        Ok(())
    }

    /// Display-tick loop
    async fn drive(
        &self,
        viewer: &mut Viewer<SimulatedBackend>,
        backend: &SimulatedBackend,
        stats: &mut RunStats,
    ) -> Result<(), CliError> {
        let hz = self.config.display_hz.max(1);
        let dt = self.config.speed / f64::from(hz);
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(hz)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut seeks = seek_schedule(&self.config.seeks, self.config.duration_s)
            .into_iter()
            .peekable();

        while stats.media_elapsed < self.config.duration_s {
            interval.tick().await;

            backend.advance(dt);
            stats.media_elapsed += dt;

            let corrections = viewer.on_display_frame();
            stats.ticks += 1;
            stats.corrections += corrections as u64;
            record_display_tick(corrections);

            while let Some(&(at, target)) = seeks.peek() {
                if stats.media_elapsed < at {
                    break;
                }
                seeks.next();
                if let Some(session) = viewer.session_mut() {
                    let landed = session.seek_to(target)?;
                    stats.seeks_issued += 1;
                    info!(target, landed, "Scripted seek");
                }
            }

            let Some(session) = viewer.session() else {
                break;
            };
            sample_drift(session, &mut stats.sync);

            if session
                .duration()
                .is_some_and(|d| !session.is_playing() && session.current_time() >= d)
            {
                info!(timecode = %session.timecode(), "Master reached the end");
                break;
            }

            if stats.ticks % u64::from(hz) == 0 {
                debug!(
                    timecode = %session.timecode(),
                    correcting = session.controller().is_correcting(),
                    "Playback progress"
                );
            }
        }

        Ok(())
    }
}

/// (media-elapsed trigger, target) pairs spread evenly over the run
fn seek_schedule(targets: &[f64], duration_s: f64) -> Vec<(f64, f64)> {
    let slots = (targets.len() + 1) as f64;
    targets
        .iter()
        .enumerate()
        .map(|(i, &target)| (duration_s * (i + 1) as f64 / slots, target))
        .collect()
}

/// Sample the drift of every synced overlay
fn sample_drift(session: &PlaybackSession, aggregator: &mut SyncStatsAggregator) {
    let controller = session.controller();
    for id in controller.overlay_ids() {
        if controller.overlay_status(&id) != Some(OverlayStatus::Synced) {
            continue;
        }
        if let Ok(drift) = controller.overlay_drift(session.master(), &id) {
            record_drift_sample(&id, drift);
            aggregator.push_drift(&id, drift);
        }
    }
}
