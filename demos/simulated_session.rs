//! Simulated Session Example
//!
//! Drives a `Viewer` over the `SimulatedBackend`: selects a video, attaches
//! two heatmap overlays with independently drifting clocks, plays at half
//! speed, scrubs and steps, then prints the sync summary.
//! No media files are needed.
//!
//! Run with: cargo run -p overlay_sync_demos --bin simulated_session [manifest.toml]

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{MediaManifest, OverlayEntry, VideoEntry};
use media_factory::{SimulatedBackend, SimulatedStreamConfig};
use observability::SyncStatsAggregator;
use playback::Viewer;

const DISPLAY_HZ: u64 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // ==== Stage 1: Manifest ====
    let manifest = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading manifest");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        demo_manifest()
    };
    let video = manifest
        .videos
        .first()
        .ok_or("manifest has no videos")?
        .clone();

    // ==== Stage 2: Backend with skewed overlay clocks ====
    let backend = SimulatedBackend::with_defaults(SimulatedStreamConfig {
        duration_s: Some(20.0),
        load_delay_s: 0.1,
        ..Default::default()
    });
    for (i, overlay) in video.overlays.iter().enumerate() {
        backend.configure(
            overlay.id.clone(),
            SimulatedStreamConfig {
                duration_s: Some(20.0),
                clock_skew: if i % 2 == 0 { 1.08 } else { 0.94 },
                ..Default::default()
            },
        );
    }

    // ==== Stage 3: Viewer ====
    let mut viewer = Viewer::new(manifest, backend.clone());
    viewer.select_video(&video.id)?;
    for overlay in &video.overlays {
        viewer.toggle_overlay(&overlay.id)?;
    }
    if let Some(session) = viewer.session_mut() {
        session.set_rate(0.5)?;
    }
    tracing::info!(overlays = ?viewer.active_overlays(), "Session ready");

    // ==== Stage 4: Display loop ====
    let mut interval = tokio::time::interval(Duration::from_millis(1000 / DISPLAY_HZ));
    let dt = 1.0 / DISPLAY_HZ as f64;
    let mut corrections = 0;
    for tick in 0..DISPLAY_HZ * 3 {
        interval.tick().await;
        backend.advance(dt);
        corrections += viewer.on_display_frame();

        if tick == DISPLAY_HZ {
            if let Some(session) = viewer.session_mut() {
                let landed = session.seek_to(8.0)?;
                tracing::info!(landed, timecode = %session.timecode(), "Scrubbed");
            }
        }
    }
    tracing::info!(corrections, "Display loop finished");

    // ==== Stage 5: Frame step ====
    if let Some(session) = viewer.session_mut() {
        let frame = session.step_frame(-5)?;
        tracing::info!(
            frame,
            total = session.total_frames(),
            timecode = %session.timecode(),
            "Stepped back"
        );
    }

    // ==== Stage 6: Summary ====
    let mut aggregator = SyncStatsAggregator::new();
    for stats in viewer.session_stats() {
        aggregator.update(&stats);
    }
    viewer.close();
    println!("{}", aggregator.summary());

    Ok(())
}

fn demo_manifest() -> MediaManifest {
    let overlay = |id: &str, group: &str| OverlayEntry {
        id: id.into(),
        label: format!("{group} heatmap"),
        path: format!("/overlays/{id}.webm"),
        age_group: Some(group.to_string()),
        opacity: 0.6,
    };
    MediaManifest::from_videos(vec![VideoEntry {
        id: "event01".into(),
        title: "Peekaboo".into(),
        video_path: "/videos/event01.mp4".into(),
        overlays: vec![overlay("event01_6mo", "6mo"), overlay("event01_12mo", "12mo")],
    }])
}
