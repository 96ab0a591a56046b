//! Randomized seek / rate / step properties.

use media_factory::SimulatedStreamConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::rig::{drift, Rig, MASTER};

const ITERATIONS: usize = 300;

fn skewed_rig(overlays: &[(&str, f64)]) -> Rig {
    let mut rig = Rig::new();
    for &(id, skew) in overlays {
        rig.backend.configure(
            id,
            SimulatedStreamConfig {
                duration_s: Some(10.0),
                clock_skew: skew,
                ..Default::default()
            },
        );
        rig.attach(id);
    }
    rig
}

#[test]
fn every_seek_lands_overlays_within_threshold() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);
    let mut rig = skewed_rig(&[("fast", 1.07), ("slow", 0.93), ("exact", 1.0)]);
    rig.session.play().unwrap();

    for _ in 0..ITERATIONS {
        for _ in 0..rng.random_range(0..5) {
            rig.tick(rng.random_range(0.0..0.3));
        }
        if rng.random_bool(0.2) {
            let _ = rig.session.toggle_play_pause();
        }

        let target = rng.random_range(-2.0..12.0);
        let landed = rig.session.seek_to(target).unwrap();
        assert!((0.0..=10.0).contains(&landed));

        let master = rig.probe(MASTER);
        for id in ["fast", "slow", "exact"] {
            let d = drift(&rig.probe(id), &master);
            assert!(d <= 0.1, "{id} drifted {d} after seek to {target}");
        }
    }
}

#[test]
fn every_rate_change_reaches_all_overlays() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0002);
    let mut rig = skewed_rig(&[("a", 1.0), ("b", 1.2)]);

    for _ in 0..ITERATIONS {
        if rng.random_bool(0.3) {
            let _ = rig.session.toggle_play_pause();
        }
        let rate = rng.random_range(0.05..8.0);
        rig.session.set_rate(rate).unwrap();

        for id in ["a", "b"] {
            assert_eq!(rig.probe(id).rate(), rate);
        }
        assert_eq!(
            rig.session.controller().is_correcting(),
            rig.session.is_playing() && rate != 1.0
        );

        // Rewind before the master runs off the end.
        rig.tick(rng.random_range(0.0..0.05));
        if rig.session.current_time() > 8.0 {
            rig.session.seek_to(0.0).unwrap();
        }
    }
}

#[test]
fn correction_ticks_bound_drift_at_non_unit_rates() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);
    let mut rig = skewed_rig(&[("fast", 1.5), ("slow", 0.6)]);
    rig.session.play().unwrap();

    for _ in 0..ITERATIONS {
        let rate = [0.25, 0.5, 2.0][rng.random_range(0..3)];
        rig.session.set_rate(rate).unwrap();

        for _ in 0..10 {
            rig.tick(rng.random_range(0.005..0.05));
            let master = rig.probe(MASTER);
            for id in ["fast", "slow"] {
                assert!(drift(&rig.probe(id), &master) <= 0.1);
            }
        }

        if rig.session.current_time() > 8.0 {
            rig.session.seek_to(0.0).unwrap();
        }
    }

    let stats = rig.session.stats();
    assert!(stats.drift_corrections > 0);
    assert!(stats.max_corrected_drift > 0.1);
}

#[test]
fn step_frame_stays_in_bounds() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0004);
    let mut rig = skewed_rig(&[("o1", 1.0)]);
    let total = rig.session.total_frames();
    assert_eq!(total, 300);

    for _ in 0..ITERATIONS {
        let delta = rng.random_range(-400..400);
        let frame = rig.session.step_frame(delta).unwrap();

        assert!((0..=total).contains(&frame));
        assert_eq!(rig.session.current_frame(), frame);
        assert!(!rig.session.is_playing());
        assert!(drift(&rig.probe("o1"), &rig.probe(MASTER)) <= 0.1);
    }
}

#[test]
fn repeated_pause_changes_nothing() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0005);
    let mut rig = skewed_rig(&[("o1", 1.0), ("o2", 1.1)]);

    for _ in 0..50 {
        if rng.random_bool(0.5) {
            rig.session.play().unwrap();
            rig.tick(rng.random_range(0.0..0.2));
        }
        rig.session.pause();

        let before: Vec<_> = ["o1", "o2"].map(|id| rig.probe(id).commands()).into();
        let events = rig.session.stats().events_processed;

        rig.session.pause();

        let after: Vec<_> = ["o1", "o2"].map(|id| rig.probe(id).commands()).into();
        assert_eq!(before, after);
        assert_eq!(rig.session.stats().events_processed, events);

        if rig.session.current_time() > 8.0 {
            rig.session.seek_to(0.0).unwrap();
        }
    }
}
