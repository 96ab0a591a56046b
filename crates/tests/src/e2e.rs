//! End-to-end: manifest file -> cache -> viewer -> sync statistics.

use std::io::Write;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{MediaManifest, OverlayStatus, ReadyState, StreamId};
use media_factory::{SimulatedBackend, SimulatedStreamConfig};
use observability::SyncStatsAggregator;
use playback::{PlaybackError, Viewer};

const MANIFEST: &str = r#"
[playback]
frame_rate = 30
drift_threshold_s = 0.1

[[videos]]
id = "event01"
title = "Peekaboo"
video_path = "/videos/event01.mp4"

[[videos.overlays]]
id = "e1_6mo"
label = "6 months"
path = "/overlays/e1_6mo.webm"
age_group = "6mo"

[[videos.overlays]]
id = "e1_12mo"
label = "12 months"
path = "/overlays/e1_12mo.webm"
age_group = "12mo"

[[videos]]
id = "event02"
title = "Ball roll"
video_path = "/videos/event02.mp4"

[[videos.overlays]]
id = "e2_6mo"
path = "/overlays/e2_6mo.webm"
age_group = "6mo"
"#;

fn load_manifest() -> MediaManifest {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(MANIFEST.as_bytes()).unwrap();
    ConfigLoader::load_from_path(file.path()).unwrap()
}

fn viewer(backend: &SimulatedBackend) -> Viewer<SimulatedBackend> {
    Viewer::new(load_manifest(), backend.clone())
}

#[test]
fn manifest_round_trips_through_json() {
    let manifest = load_manifest();
    let json = ConfigLoader::to_json(&manifest).unwrap();
    let reloaded = ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json).unwrap();

    assert_eq!(reloaded.videos.len(), 2);
    assert_eq!(reloaded.overlay_count(), 3);
    assert_eq!(reloaded.age_groups(), vec!["6mo", "12mo"]);
}

#[test]
fn preload_opens_every_resource_once() {
    let backend = SimulatedBackend::new();
    let viewer = viewer(&backend);

    assert_eq!(viewer.cache().len(), 5);
    for id in ["event01", "event02", "e1_6mo", "e1_12mo", "e2_6mo"] {
        assert_eq!(backend.open_count(id), 1, "{id}");
        assert_eq!(backend.probe(id).unwrap().ready_state(), ReadyState::Ready);
    }
}

#[test]
fn select_toggle_and_switch_videos() {
    let backend = SimulatedBackend::new();
    let mut viewer = viewer(&backend);

    viewer.select_video("event01").unwrap();
    assert!(viewer.session().unwrap().is_playing());

    assert!(viewer.toggle_overlay("e1_6mo").unwrap());
    assert!(viewer.toggle_overlay("e1_12mo").unwrap());
    assert_eq!(
        viewer.active_overlays(),
        vec![StreamId::from("e1_12mo"), StreamId::from("e1_6mo")]
    );
    assert!(backend.probe("e1_6mo").unwrap().is_playing());

    for _ in 0..30 {
        backend.advance(1.0 / 60.0);
        viewer.on_display_frame();
    }

    assert!(!viewer.toggle_overlay("e1_12mo").unwrap());
    let released = backend.probe("e1_12mo").unwrap();
    assert!(!released.is_playing());
    assert_eq!(released.subscriber_count(), 0);

    viewer.select_video("event02").unwrap();
    assert!(viewer.active_overlays().is_empty());
    assert!(!backend.probe("event01").unwrap().is_playing());
    assert!(!backend.probe("e1_6mo").unwrap().is_playing());

    // Everything went back to the cache; nothing was reopened.
    assert_eq!(backend.open_count("event01"), 1);
    assert_eq!(backend.open_count("e1_6mo"), 1);

    assert!(matches!(
        viewer.toggle_overlay("e1_6mo"),
        Err(PlaybackError::UnknownOverlay { .. })
    ));
    assert_eq!(viewer.session_stats().len(), 2);
}

#[test]
fn age_group_filters_available_overlays() {
    let backend = SimulatedBackend::new();
    let mut viewer = viewer(&backend);
    viewer.select_video("event01").unwrap();

    assert_eq!(viewer.age_groups(), vec!["6mo", "12mo"]);
    viewer.set_age_group(Some("12mo")).unwrap();
    let ids: Vec<_> = viewer
        .available_overlays()
        .iter()
        .map(|o| o.id.to_string())
        .collect();
    assert_eq!(ids, vec!["e1_12mo"]);

    assert!(matches!(
        viewer.set_age_group(Some("24mo")),
        Err(PlaybackError::UnknownAgeGroup { .. })
    ));
    viewer.set_age_group(None).unwrap();
    assert_eq!(viewer.available_overlays().len(), 2);
}

#[test]
fn broken_overlay_recovers_after_reopen() {
    let backend = SimulatedBackend::new();
    backend.configure(
        "e1_6mo",
        SimulatedStreamConfig {
            fail_load: true,
            ..Default::default()
        },
    );
    let mut viewer = viewer(&backend);
    assert_eq!(viewer.cache().failed_ids(), vec![StreamId::from("e1_6mo")]);

    viewer.select_video("event01").unwrap();
    viewer.toggle_overlay("e1_6mo").unwrap();
    let status = |v: &Viewer<SimulatedBackend>| {
        v.session()
            .and_then(|s| s.controller().overlay_status("e1_6mo"))
    };
    assert_eq!(status(&viewer), Some(OverlayStatus::Unresolved));
    assert!(viewer.session().unwrap().is_playing());

    backend.configure("e1_6mo", SimulatedStreamConfig::default());
    viewer.toggle_overlay("e1_6mo").unwrap();
    viewer.toggle_overlay("e1_6mo").unwrap();

    assert_eq!(status(&viewer), Some(OverlayStatus::Synced));
    assert!(backend.probe("e1_6mo").unwrap().is_playing());
}

#[test]
fn delayed_loads_converge_on_the_master_frame() {
    let backend = SimulatedBackend::with_defaults(SimulatedStreamConfig {
        load_delay_s: 0.25,
        ..Default::default()
    });
    let mut viewer = viewer(&backend);
    viewer.select_video("event01").unwrap();
    viewer.toggle_overlay("e1_6mo").unwrap();

    let overlay = backend.probe("e1_6mo").unwrap();
    assert_eq!(overlay.ready_state(), ReadyState::Loading);

    for _ in 0..60 {
        backend.advance(1.0 / 60.0);
        viewer.on_display_frame();
    }

    let master = backend.probe("event01").unwrap();
    assert!(master.ready_state().is_ready());
    assert!(overlay.is_playing());
    assert!((overlay.position() - master.position()).abs() <= 0.1);
}

#[tokio::test]
async fn interval_driven_session_feeds_the_aggregator() {
    let backend = SimulatedBackend::new();
    backend.configure(
        "e2_6mo",
        SimulatedStreamConfig {
            clock_skew: 1.4,
            ..Default::default()
        },
    );
    let mut viewer = viewer(&backend);
    viewer.select_video("event02").unwrap();
    viewer.toggle_overlay("e2_6mo").unwrap();
    viewer.session_mut().unwrap().set_rate(0.5).unwrap();

    let mut interval = tokio::time::interval(Duration::from_millis(1));
    let mut corrections = 0;
    for _ in 0..120 {
        interval.tick().await;
        backend.advance(0.05);
        corrections += viewer.on_display_frame();
    }
    assert!(corrections > 0);

    let mut aggregator = SyncStatsAggregator::new();
    for stats in viewer.session_stats() {
        aggregator.update(&stats);
    }
    viewer.close();

    let summary = aggregator.summary();
    assert_eq!(summary.sessions, 1);
    assert_eq!(summary.drift_corrections, corrections as u64);
    assert!(summary.correction_ticks >= 119);
    assert!(summary.to_string().starts_with("=== Sync Summary ==="));
    assert_eq!(backend.probe("event02").unwrap().subscriber_count(), 0);
}
