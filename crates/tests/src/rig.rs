//! Shared session rig over the simulated backend.

use contracts::{PlaybackSettings, StreamBackend, StreamHandle};
use media_factory::{SimulatedBackend, SimulatedStreamConfig, StreamProbe};
use playback::PlaybackSession;

pub const MASTER: &str = "base";

/// Backend plus a session whose master (`base`, 10 s) is loaded and paused at 0
pub struct Rig {
    pub backend: SimulatedBackend,
    pub session: PlaybackSession,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_defaults(SimulatedStreamConfig {
            duration_s: Some(10.0),
            ..Default::default()
        })
    }

    pub fn with_defaults(defaults: SimulatedStreamConfig) -> Self {
        let backend = SimulatedBackend::with_defaults(defaults);
        let master = open(&backend, MASTER);
        let session = PlaybackSession::new(master, &PlaybackSettings::default()).unwrap();
        Self { backend, session }
    }

    /// Open, load and attach an overlay
    pub fn attach(&mut self, id: &str) -> StreamProbe {
        let overlay = open(&self.backend, id);
        self.session.attach_overlay(overlay).unwrap();
        self.probe(id)
    }

    pub fn probe(&self, id: &str) -> StreamProbe {
        self.backend.probe(id).unwrap()
    }

    /// Advance every stream by `dt` and deliver one display tick
    pub fn tick(&mut self, dt: f64) -> usize {
        self.backend.advance(dt);
        self.session.on_display_frame()
    }
}

pub fn open(backend: &SimulatedBackend, id: &str) -> Box<dyn StreamHandle> {
    let mut stream = backend.open(id.into(), &format!("/media/{id}.mp4"));
    stream.load();
    stream
}

pub fn drift(overlay: &StreamProbe, master: &StreamProbe) -> f64 {
    (overlay.position() - master.position()).abs()
}
