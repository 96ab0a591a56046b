//! Acceptance scenarios for master/overlay locking.

use contracts::{OverlayStatus, StreamId};
use media_factory::SimulatedStreamConfig;

use crate::rig::{drift, Rig, MASTER};

/// Paused master at frame 0: a new overlay lands on 0, paused and muted.
#[test]
fn attach_to_paused_master() {
    let mut rig = Rig::new();
    let o1 = rig.attach("o1");

    assert_eq!(o1.position(), 0.0);
    assert!(!o1.is_playing());
    assert!(o1.is_muted());
    assert_eq!(rig.session.controller().overlay_status("o1"), Some(OverlayStatus::Synced));
}

/// Seeking a playing master puts the overlay on the exact frame time.
#[test]
fn seek_while_playing_lands_on_frame() {
    let mut rig = Rig::with_defaults(SimulatedStreamConfig::default());
    rig.backend.configure(
        "o1",
        SimulatedStreamConfig {
            clock_skew: 1.1,
            ..Default::default()
        },
    );
    let o1 = rig.attach("o1");
    rig.session.play().unwrap();
    for _ in 0..20 {
        rig.tick(0.1);
    }
    assert!(drift(&o1, &rig.probe(MASTER)) > 0.1);

    rig.session.seek_to(12.0).unwrap();
    assert_eq!(rig.probe(MASTER).position(), 12.0);
    assert_eq!(o1.position(), 12.0);

    rig.session.seek_to(4.0).unwrap();
    assert_eq!(o1.position(), 4.0);
    assert!(o1.is_playing());
}

/// Rate change while playing reaches every overlay and starts the loop.
#[test]
fn rate_change_while_playing() {
    let mut rig = Rig::new();
    let o1 = rig.attach("o1");
    let o2 = rig.attach("o2");
    rig.session.play().unwrap();

    rig.session.set_rate(0.25).unwrap();

    assert_eq!(o1.rate(), 0.25);
    assert_eq!(o2.rate(), 0.25);
    assert!(rig.session.controller().is_correcting());
}

/// Rate change while paused reaches overlays but leaves the loop idle.
#[test]
fn rate_change_while_paused() {
    let mut rig = Rig::new();
    let o1 = rig.attach("o1");

    rig.session.set_rate(0.25).unwrap();

    assert_eq!(o1.rate(), 0.25);
    assert!(!rig.session.controller().is_correcting());

    rig.session.play().unwrap();
    assert!(rig.session.controller().is_correcting());
}

/// A broken overlay never blocks the master or its siblings.
#[test]
fn failed_overlay_does_not_block_play() {
    let mut rig = Rig::new();
    rig.backend.configure(
        "broken",
        SimulatedStreamConfig {
            fail_load: true,
            ..Default::default()
        },
    );
    let broken = rig.attach("broken");
    let good = rig.attach("good");

    rig.session.play().unwrap();

    assert!(rig.session.is_playing());
    assert!(good.is_playing());
    assert!(!broken.is_playing());
    assert_eq!(
        rig.session.controller().overlay_status("broken"),
        Some(OverlayStatus::Unresolved)
    );
    assert!(rig.session.stats().play_failures >= 1);
    assert_eq!(rig.session.stats().unresolved, vec![StreamId::from("broken")]);

    rig.session.set_rate(2.0).unwrap();
    let broken_seeks = broken.commands().seek;
    for _ in 0..10 {
        rig.tick(0.1);
    }
    assert!(good.is_playing());
    assert_eq!(broken.commands().seek, broken_seeks);
}

/// A master that finishes loading after selection pulls overlays onto its frame.
#[test]
fn master_load_resnaps_overlays() {
    let mut rig = Rig::with_defaults(SimulatedStreamConfig {
        duration_s: Some(10.0),
        load_delay_s: 0.5,
        ..Default::default()
    });
    let o1 = rig.attach("o1");
    rig.session.seek_to(2.0).unwrap();
    let snaps_before = rig.session.stats().snaps;

    rig.tick(0.5);

    let master = rig.probe(MASTER);
    assert!(master.ready_state().is_ready());
    assert!(o1.ready_state().is_ready());
    assert_eq!(o1.position(), master.position());
    assert!(rig.session.stats().snaps > snaps_before);
}

/// A looping master wraps to 0 and takes its overlays with it.
#[test]
fn looping_master_wraps_overlays() {
    let mut rig = Rig::with_defaults(SimulatedStreamConfig {
        duration_s: Some(2.0),
        looping: true,
        ..Default::default()
    });
    rig.backend.configure(
        "o1",
        SimulatedStreamConfig {
            duration_s: Some(2.0),
            looping: true,
            clock_skew: 1.05,
            ..Default::default()
        },
    );
    let o1 = rig.attach("o1");
    rig.session.play().unwrap();

    for _ in 0..21 {
        rig.tick(0.1);
    }

    let master = rig.probe(MASTER);
    assert!(master.position() < 0.5);
    assert!(master.is_playing());
    assert!(o1.is_playing());
    assert!(drift(&o1, &master) <= 0.1);
}

/// Pausing a paused master is a no-op for every overlay.
#[test]
fn pause_on_paused_master_is_silent() {
    let mut rig = Rig::new();
    let o1 = rig.attach("o1");
    let before = o1.commands();
    let stats_before = rig.session.stats();

    rig.session.pause();
    rig.session.pause();

    assert_eq!(o1.commands(), before);
    assert_eq!(
        rig.session.stats().events_processed,
        stats_before.events_processed
    );
}
