//! PlaybackSession - user-facing control surface over one master stream.
//!
//! Only the session writes to the master. Every command is followed by a pump
//! of the controller queue so overlays are corrected before the call returns.

use contracts::{ContractError, PlaybackSettings, StreamHandle, SyncStats};
use sync_engine::{AttachError, FrameClock, SyncController};
use tracing::{debug, info, instrument};

use crate::error::{PlaybackError, Result};

/// Playback session
pub struct PlaybackSession {
    master: Box<dyn StreamHandle>,
    controller: SyncController,
    clock: FrameClock,
    settings: PlaybackSettings,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("master", &self.master)
            .field("controller", &self.controller)
            .finish()
    }
}

impl PlaybackSession {
    /// Start a session over `master`
    ///
    /// # Errors
    /// Fails only if the fresh controller rejects the master.
    #[instrument(
        name = "playback_session_new",
        skip(master, settings),
        fields(stream_id = %master.stream_id(), fps = settings.frame_rate)
    )]
    pub fn new(mut master: Box<dyn StreamHandle>, settings: &PlaybackSettings) -> Result<Self> {
        let mut controller = SyncController::from_settings(settings);
        controller.attach_master(master.as_mut())?;
        let mut session = Self {
            master,
            controller,
            clock: FrameClock::new(settings.frame_rate),
            settings: settings.clone(),
        };
        session.pump();
        Ok(session)
    }

    // ===== Transport =====

    /// Toggle between playing and paused. Returns the new playing state.
    pub fn toggle_play_pause(&mut self) -> Result<bool> {
        if self.master.is_playing() {
            self.pause();
        } else {
            self.play()?;
        }
        Ok(self.master.is_playing())
    }

    /// Start the master
    ///
    /// # Errors
    /// `PlaybackStart` / `ResourceLoad` from the master. Overlay failures never
    /// surface here.
    #[instrument(name = "playback_session_play", skip(self), fields(stream_id = %self.master.stream_id()))]
    pub fn play(&mut self) -> Result<()> {
        let result = self.master.play();
        self.pump();
        result.map_err(PlaybackError::from)
    }

    /// Pause the master. Pausing a paused master changes nothing.
    #[instrument(name = "playback_session_pause", skip(self), fields(stream_id = %self.master.stream_id()))]
    pub fn pause(&mut self) {
        self.master.pause();
        self.pump();
    }

    /// Pause, then move `delta` frames, clamped to `[0, total_frames]`
    ///
    /// Without a known duration only the lower bound applies. Returns the
    /// target frame.
    #[instrument(name = "playback_session_step_frame", skip(self))]
    pub fn step_frame(&mut self, delta: i64) -> Result<i64> {
        self.pause();

        let current = self.current_frame();
        let mut target = current.saturating_add(delta).max(0);
        if let Some(duration) = self.master.duration() {
            target = target.min(self.clock.total_frames(duration));
        }

        let time = self.clock.frame_to_time(target);
        let result = self.master.seek(time);
        self.pump();
        result?;

        debug!(from = current, to = target, time, "stepped");
        Ok(target)
    }

    /// Seek the master to `t` seconds, clamped to `[0, duration]`
    ///
    /// Returns the applied time.
    ///
    /// # Errors
    /// `InvalidPosition` for non-finite input, `Seek` from the master.
    #[instrument(name = "playback_session_seek_to", skip(self))]
    pub fn seek_to(&mut self, t: f64) -> Result<f64> {
        if !t.is_finite() {
            return Err(PlaybackError::InvalidPosition { position: t });
        }
        let mut target = t.max(0.0);
        if let Some(duration) = self.master.duration() {
            target = target.min(duration);
        }

        let result = self.master.seek(target);
        self.pump();
        result?;
        Ok(target)
    }

    /// Seek the master to the start of `frame`
    pub fn seek_to_frame(&mut self, frame: i64) -> Result<f64> {
        self.seek_to(self.clock.frame_to_time(frame))
    }

    /// Change the master's rate
    ///
    /// # Errors
    /// `InvalidRate` unless `rate` is positive and finite.
    #[instrument(name = "playback_session_set_rate", skip(self))]
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ContractError::InvalidRate { rate }.into());
        }
        self.master.set_rate(rate);
        self.pump();
        info!(rate, "playback rate set");
        Ok(())
    }

    // ===== Overlays =====

    /// Attach an overlay to the running controller
    ///
    /// Returns an overlay previously attached under the same id.
    pub fn attach_overlay(
        &mut self,
        overlay: Box<dyn StreamHandle>,
    ) -> std::result::Result<Option<Box<dyn StreamHandle>>, AttachError> {
        self.pump();
        let replaced = self.controller.attach_overlay(self.master.as_ref(), overlay)?;
        self.pump();
        Ok(replaced)
    }

    /// Detach an overlay; it comes back paused
    pub fn detach_overlay(&mut self, overlay_id: &str) -> Option<Box<dyn StreamHandle>> {
        self.pump();
        self.controller.detach_overlay(overlay_id)
    }

    // ===== Host hooks =====

    /// Hand queued stream events to the controller
    pub fn pump(&mut self) -> usize {
        self.controller.process_events(self.master.as_ref())
    }

    /// Display-frame tick. Returns the number of drift corrections.
    pub fn on_display_frame(&mut self) -> usize {
        self.pump();
        self.controller.on_display_frame(self.master.as_ref())
    }

    /// Tear the controller down and release every stream
    ///
    /// Returns the master followed by the detached overlays.
    #[instrument(name = "playback_session_end", skip(self), fields(stream_id = %self.master.stream_id()))]
    pub fn end(mut self) -> (Box<dyn StreamHandle>, Vec<Box<dyn StreamHandle>>) {
        self.pump();
        let overlays = self.controller.teardown(self.master.as_mut());
        self.master.pause();
        info!(overlays = overlays.len(), "session ended");
        (self.master, overlays)
    }

    /// Swap in a new master source
    ///
    /// The current controller is torn down and a fresh one observes the new
    /// master. Returns the old master and every overlay it had.
    ///
    /// # Errors
    /// Fails only if the fresh controller rejects the master.
    pub fn replace_master(
        &mut self,
        master: Box<dyn StreamHandle>,
    ) -> Result<(Box<dyn StreamHandle>, Vec<Box<dyn StreamHandle>>)> {
        let next = Self::new(master, &self.settings)?;
        let previous = std::mem::replace(self, next);
        Ok(previous.end())
    }

    // ===== Derived state =====

    pub fn current_time(&self) -> f64 {
        self.master.position()
    }

    pub fn current_frame(&self) -> i64 {
        self.clock.time_to_frame(self.master.position())
    }

    /// Total frames of the master, 0 while the duration is unknown
    pub fn total_frames(&self) -> i64 {
        self.master
            .duration()
            .map(|d| self.clock.total_frames(d))
            .unwrap_or(0)
    }

    pub fn duration(&self) -> Option<f64> {
        self.master.duration()
    }

    pub fn is_playing(&self) -> bool {
        self.master.is_playing()
    }

    pub fn rate(&self) -> f64 {
        self.master.rate()
    }

    /// Current time as `MM:SS:FF`
    pub fn timecode(&self) -> String {
        self.clock.format_timecode(self.master.position())
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    pub fn master(&self) -> &dyn StreamHandle {
        self.master.as_ref()
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn stats(&self) -> SyncStats {
        self.controller.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_factory::{SimulatedStream, SimulatedStreamConfig, StreamProbe};

    fn stream(id: &str, duration_s: Option<f64>) -> (Box<dyn StreamHandle>, StreamProbe) {
        let mut s = SimulatedStream::new(
            id.into(),
            format!("/media/{id}.mp4"),
            SimulatedStreamConfig {
                duration_s,
                ..Default::default()
            },
        );
        s.load();
        let probe = s.probe();
        (Box::new(s), probe)
    }

    fn session() -> (PlaybackSession, StreamProbe) {
        let (master, probe) = stream("base", Some(10.0));
        (
            PlaybackSession::new(master, &PlaybackSettings::default()).unwrap(),
            probe,
        )
    }

    #[test]
    fn test_toggle_play_pause() {
        let (mut session, _) = session();
        assert!(session.toggle_play_pause().unwrap());
        assert!(!session.toggle_play_pause().unwrap());
    }

    #[test]
    fn test_step_frame_pauses_and_clamps() {
        let (mut session, _) = session();
        session.play().unwrap();

        assert_eq!(session.step_frame(3).unwrap(), 3);
        assert!(!session.is_playing());
        assert_eq!(session.current_frame(), 3);

        assert_eq!(session.step_frame(-10).unwrap(), 0);
        assert_eq!(session.step_frame(10_000).unwrap(), 300);
        assert_eq!(session.current_frame(), session.total_frames());
    }

    #[test]
    fn test_step_frame_without_duration_has_no_upper_bound() {
        let (master, _) = stream("base", None);
        let mut session = PlaybackSession::new(master, &PlaybackSettings::default()).unwrap();
        assert_eq!(session.total_frames(), 0);
        assert_eq!(session.step_frame(45).unwrap(), 45);
        assert!((session.current_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_seek_to_clamps_and_rejects_nan() {
        let (mut session, _) = session();
        assert_eq!(session.seek_to(42.0).unwrap(), 10.0);
        assert_eq!(session.seek_to(-1.0).unwrap(), 0.0);
        assert!(matches!(
            session.seek_to(f64::NAN),
            Err(PlaybackError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_seek_to_frame_and_timecode() {
        let (mut session, _) = session();
        session.seek_to_frame(75).unwrap();
        assert!((session.current_time() - 2.5).abs() < 1e-9);
        assert_eq!(session.timecode(), "00:02:15");
    }

    #[test]
    fn test_set_rate_rejects_non_positive() {
        let (mut session, probe) = session();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = session.set_rate(bad).unwrap_err();
            assert!(matches!(
                err,
                PlaybackError::Contract(ContractError::InvalidRate { .. })
            ));
        }
        assert_eq!(probe.commands().set_rate, 0);
        session.set_rate(1.5).unwrap();
        assert_eq!(session.rate(), 1.5);
    }

    #[test]
    fn test_master_play_refused_is_reported() {
        let mut master = SimulatedStream::new(
            "base".into(),
            "/media/base.mp4",
            SimulatedStreamConfig {
                reject_play: true,
                ..Default::default()
            },
        );
        master.load();
        let mut session =
            PlaybackSession::new(Box::new(master), &PlaybackSettings::default()).unwrap();

        assert!(matches!(
            session.play(),
            Err(PlaybackError::Contract(ContractError::PlaybackStart { .. }))
        ));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_replace_master_returns_overlays() {
        let (mut session, old_probe) = session();
        let (o1, o1_probe) = stream("o1", Some(10.0));
        session.attach_overlay(o1).unwrap();

        let (next, _) = stream("base2", Some(5.0));
        let (old, overlays) = session.replace_master(next).unwrap();

        assert_eq!(old.stream_id(), "base");
        assert_eq!(overlays.len(), 1);
        assert_eq!(old_probe.subscriber_count(), 0);
        assert_eq!(o1_probe.subscriber_count(), 0);
        assert_eq!(session.master().stream_id(), "base2");
        assert_eq!(session.controller().overlay_count(), 0);
    }
}
