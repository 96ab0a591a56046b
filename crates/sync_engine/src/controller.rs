//! Sync controller: keeps attached overlays time-locked to a master stream.
//!
//! Master and overlay events are forwarded by subscription callbacks into a
//! queue and handled in delivery order by [`SyncController::process_events`].
//! Every overlay is corrected for one event before the next event is taken.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{
    ContractError, ControllerState, OverlayStatus, PlaybackSettings, ReadyState, StreamEvent,
    StreamHandle, StreamId, StreamNotification, SubscriptionId, SyncStats,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

use crate::correction::{correction_wanted, drift, exceeds_threshold, CorrectionLoop};
use crate::error::{AttachError, Result, SyncError};
use crate::frame_clock::FrameClock;

/// An overlay owned by the controller while attached
struct AttachedOverlay {
    handle: Box<dyn StreamHandle>,
    subscription: SubscriptionId,
    status: OverlayStatus,
}

/// Multi-stream sync controller
///
/// Borrows the master on every call (only the session writes to it) and owns
/// every attached overlay.
pub struct SyncController {
    clock: FrameClock,
    drift_threshold: f64,
    state: ControllerState,
    master_id: Option<StreamId>,
    master_subscription: Option<SubscriptionId>,
    overlays: HashMap<StreamId, AttachedOverlay>,
    events_tx: mpsc::UnboundedSender<StreamNotification>,
    events_rx: mpsc::UnboundedReceiver<StreamNotification>,
    correction: CorrectionLoop,
    stats: SyncStats,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("state", &self.state)
            .field("master_id", &self.master_id)
            .field("overlays", &self.overlay_ids())
            .field("correcting", &self.correction.is_running())
            .finish()
    }
}

impl SyncController {
    /// Create an idle controller
    pub fn new(clock: FrameClock, drift_threshold: f64) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            clock,
            drift_threshold,
            state: ControllerState::Idle,
            master_id: None,
            master_subscription: None,
            overlays: HashMap::new(),
            events_tx,
            events_rx,
            correction: CorrectionLoop::new(),
            stats: SyncStats::default(),
        }
    }

    /// Create an idle controller from manifest playback settings
    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self::new(FrameClock::new(settings.frame_rate), settings.drift_threshold_s)
    }

    // ===== Lifecycle =====

    /// Start observing `master`
    ///
    /// # Errors
    /// `TornDown` after teardown, `MasterAlreadyAttached` when attached.
    #[instrument(
        name = "sync_controller_attach_master",
        skip(self, master),
        fields(stream_id = %master.stream_id())
    )]
    pub fn attach_master(&mut self, master: &mut dyn StreamHandle) -> Result<()> {
        match self.state {
            ControllerState::TornDown => return Err(SyncError::TornDown),
            ControllerState::Attached => {
                return Err(SyncError::MasterAlreadyAttached {
                    stream_id: self
                        .master_id
                        .as_ref()
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                })
            }
            ControllerState::Idle => {}
        }

        let subscription = master.subscribe(self.forwarder());
        self.master_id = Some(master.stream_id().clone());
        self.master_subscription = Some(subscription);
        self.state = ControllerState::Attached;

        info!(
            ready_state = ?master.ready_state(),
            position = master.position(),
            rate = master.rate(),
            "master attached"
        );
        Ok(())
    }

    /// Attach an overlay and bring it onto the master's frame
    ///
    /// Mutes the overlay, copies the master's rate, snaps it to the master's
    /// frame and starts it if the master is playing. An overlay already attached
    /// under the same id is detached and returned.
    ///
    /// # Errors
    /// The overlay is handed back inside [`AttachError`].
    #[instrument(
        name = "sync_controller_attach_overlay",
        skip(self, master, overlay),
        fields(stream_id = %overlay.stream_id())
    )]
    pub fn attach_overlay(
        &mut self,
        master: &dyn StreamHandle,
        mut overlay: Box<dyn StreamHandle>,
    ) -> std::result::Result<Option<Box<dyn StreamHandle>>, AttachError> {
        if let Err(reason) = self.check_master(master) {
            return Err(AttachError::new(reason, overlay));
        }
        if overlay.stream_id() == master.stream_id() {
            let reason = SyncError::OverlayIsMaster {
                stream_id: overlay.stream_id().to_string(),
            };
            return Err(AttachError::new(reason, overlay));
        }

        let stream_id = overlay.stream_id().clone();
        let replaced = self.detach_overlay(&stream_id);
        if replaced.is_some() {
            debug!("replacing overlay attached under the same id");
        }

        let subscription = overlay.subscribe(self.forwarder());
        let status = if overlay.ready_state() == ReadyState::Errored {
            OverlayStatus::Unresolved
        } else {
            OverlayStatus::Synced
        };
        let mut entry = AttachedOverlay {
            handle: overlay,
            subscription,
            status,
        };

        entry.handle.set_muted(true);
        let target = self.clock.snap(master.position());
        self.align(master, &mut entry, target);

        info!(
            ready_state = ?entry.handle.ready_state(),
            position = target,
            rate = master.rate(),
            "overlay attached"
        );
        self.overlays.insert(stream_id, entry);
        metrics::gauge!("overlay_sync_overlays_attached").set(self.overlays.len() as f64);

        self.refresh_loop(master);
        Ok(replaced)
    }

    /// Detach an overlay without affecting its siblings
    ///
    /// The overlay is paused and released. A running correction loop whose
    /// overlay set becomes empty stops on its next tick.
    #[instrument(name = "sync_controller_detach_overlay", skip(self))]
    pub fn detach_overlay(&mut self, stream_id: &str) -> Option<Box<dyn StreamHandle>> {
        let mut entry = self.overlays.remove(stream_id)?;
        entry.handle.unsubscribe(entry.subscription);
        entry.handle.pause();
        metrics::gauge!("overlay_sync_overlays_attached").set(self.overlays.len() as f64);
        info!("overlay detached");
        Some(entry.handle)
    }

    /// Stop the loop, release every listener and hand back all overlays
    ///
    /// Terminal and idempotent: later calls return nothing.
    #[instrument(
        name = "sync_controller_teardown",
        skip(self, master),
        fields(stream_id = %master.stream_id(), overlay_count = self.overlays.len())
    )]
    pub fn teardown(&mut self, master: &mut dyn StreamHandle) -> Vec<Box<dyn StreamHandle>> {
        if self.state == ControllerState::TornDown {
            return Vec::new();
        }

        self.correction.cancel();

        if let Some(subscription) = self.master_subscription.take() {
            if self.master_id.as_ref() == Some(master.stream_id()) {
                master.unsubscribe(subscription);
            } else {
                warn!(
                    expected = ?self.master_id,
                    "teardown called with a different master, listener left in place"
                );
            }
        }

        let ids = self.overlay_ids();
        let released: Vec<Box<dyn StreamHandle>> = ids
            .iter()
            .filter_map(|id| self.detach_overlay(id))
            .collect();

        let mut discarded = 0usize;
        while self.events_rx.try_recv().is_ok() {
            discarded += 1;
        }

        self.state = ControllerState::TornDown;
        info!(released = released.len(), discarded, "sync controller torn down");
        released
    }

    // ===== Event handling =====

    /// Handle queued stream events in delivery order
    ///
    /// Returns the number of notifications taken from the queue.
    pub fn process_events(&mut self, master: &dyn StreamHandle) -> usize {
        let mut handled = 0;
        while let Ok(notification) = self.events_rx.try_recv() {
            handled += 1;
            if self.state != ControllerState::Attached {
                continue;
            }
            if self.master_id.as_ref() == Some(&notification.stream_id) {
                self.on_master_event(master, notification.event);
            } else {
                self.on_overlay_event(master, notification);
            }
        }
        handled
    }

    #[instrument(
        name = "sync_controller_master_event",
        skip(self, master),
        fields(stream_id = %master.stream_id())
    )]
    fn on_master_event(&mut self, master: &dyn StreamHandle, event: StreamEvent) {
        self.stats.events_processed += 1;
        metrics::counter!("overlay_sync_master_events_total", "kind" => event_kind(&event))
            .increment(1);

        match event {
            StreamEvent::Loaded => {
                debug!("master loaded, re-snapping overlays");
                self.snap_all(master);
                self.refresh_loop(master);
            }
            StreamEvent::PlayingStarted => {
                let rate = master.rate();
                for (stream_id, entry) in &mut self.overlays {
                    if entry.handle.rate() != rate {
                        entry.handle.set_rate(rate);
                        self.stats.rate_updates += 1;
                    }
                    try_play(stream_id, entry.handle.as_mut(), &mut self.stats);
                }
                self.refresh_loop(master);
            }
            StreamEvent::PlayingStopped => {
                if self.correction.cancel() {
                    debug!("correction loop cancelled");
                }
                for entry in self.overlays.values_mut() {
                    entry.handle.pause();
                }
            }
            StreamEvent::PositionJumped { position } => {
                trace!(position, "master position jumped");
                self.snap_all(master);
                self.refresh_loop(master);
            }
            StreamEvent::RateChanged { rate: reported } => {
                // A later rate change may already be queued; follow the master.
                let rate = master.rate();
                trace!(reported, rate, "master rate changed");
                for entry in self.overlays.values_mut() {
                    entry.handle.set_rate(rate);
                    self.stats.rate_updates += 1;
                }
                debug!(rate, overlays = self.overlays.len(), "rate propagated");
                self.snap_all(master);
                self.refresh_loop(master);
            }
            StreamEvent::Error { message } => {
                warn!(error = %message, "master stream reported an error");
                self.correction.cancel();
            }
        }
    }

    #[instrument(
        name = "sync_controller_overlay_event",
        skip(self, master, notification),
        fields(stream_id = %notification.stream_id)
    )]
    fn on_overlay_event(&mut self, master: &dyn StreamHandle, notification: StreamNotification) {
        let target = self.clock.snap(master.position());
        let Some(mut entry) = self.overlays.remove(&notification.stream_id) else {
            trace!("event from a detached stream ignored");
            return;
        };

        match notification.event {
            StreamEvent::Loaded => {
                if entry.status == OverlayStatus::Unresolved {
                    info!("overlay recovered");
                }
                entry.status = OverlayStatus::Synced;
                self.align(master, &mut entry, target);
            }
            StreamEvent::Error { message } => {
                warn!(error = %message, "overlay errored, skipping until it reloads");
                entry.status = OverlayStatus::Unresolved;
                metrics::counter!("overlay_sync_overlay_errors_total").increment(1);
            }
            _ => {}
        }

        self.overlays.insert(notification.stream_id, entry);
    }

    /// Called once per display frame by the host
    ///
    /// While the loop runs, forces every overlay whose divergence exceeds the
    /// drift threshold back onto the master's exact position. Returns the number
    /// of corrections issued.
    #[instrument(
        level = "trace",
        name = "sync_controller_display_frame",
        skip(self, master),
        fields(stream_id = %master.stream_id())
    )]
    pub fn on_display_frame(&mut self, master: &dyn StreamHandle) -> usize {
        if !self.correction.is_running() || self.state != ControllerState::Attached {
            return 0;
        }
        if !correction_wanted(master.is_playing(), master.rate(), self.overlays.len()) {
            self.correction.cancel();
            debug!(
                playing = master.is_playing(),
                rate = master.rate(),
                overlays = self.overlays.len(),
                "correction loop stopped"
            );
            return 0;
        }

        self.stats.correction_ticks += 1;
        let master_position = master.position();
        let threshold = self.drift_threshold;
        let mut corrected = 0;

        for (stream_id, entry) in &mut self.overlays {
            if entry.status == OverlayStatus::Unresolved
                || entry.handle.ready_state() == ReadyState::Errored
            {
                continue;
            }

            let divergence = drift(entry.handle.position(), master_position);
            if !exceeds_threshold(divergence, threshold) {
                continue;
            }

            match entry.handle.seek(master_position) {
                Ok(()) => {
                    corrected += 1;
                    self.stats.record_drift_correction(divergence);
                    metrics::histogram!("overlay_sync_corrected_drift_seconds")
                        .record(divergence.abs());
                    debug!(%stream_id, drift = divergence, "drift corrected");
                }
                Err(e) => {
                    self.stats.seek_failures += 1;
                    entry.status = OverlayStatus::Unresolved;
                    let unresolved = ContractError::SyncDriftUnresolved {
                        stream_id: stream_id.to_string(),
                        drift: divergence,
                    };
                    warn!(error = %unresolved, cause = %e, "overlay left unresolved");
                }
            }
        }

        if corrected > 0 {
            metrics::counter!("overlay_sync_drift_corrections_total").increment(corrected as u64);
        }
        corrected
    }

    // ===== Queries =====

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn master_id(&self) -> Option<&StreamId> {
        self.master_id.as_ref()
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    pub fn drift_threshold(&self) -> f64 {
        self.drift_threshold
    }

    /// Whether the continuous correction loop is running
    pub fn is_correcting(&self) -> bool {
        self.correction.is_running()
    }

    /// Attached overlay ids, sorted
    pub fn overlay_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.overlays.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn overlay(&self, stream_id: &str) -> Option<&dyn StreamHandle> {
        self.overlays.get(stream_id).map(|e| e.handle.as_ref())
    }

    pub fn overlay_status(&self, stream_id: &str) -> Option<OverlayStatus> {
        self.overlays.get(stream_id).map(|e| e.status)
    }

    /// Current divergence of an attached overlay
    ///
    /// # Errors
    /// `UnknownStream` when not attached, `SyncDriftUnresolved` when the
    /// overlay is being skipped by correction.
    pub fn overlay_drift(
        &self,
        master: &dyn StreamHandle,
        stream_id: &str,
    ) -> std::result::Result<f64, ContractError> {
        let entry = self
            .overlays
            .get(stream_id)
            .ok_or_else(|| ContractError::unknown_stream(stream_id))?;
        let divergence = drift(entry.handle.position(), master.position());
        match entry.status {
            OverlayStatus::Synced => Ok(divergence),
            OverlayStatus::Unresolved => Err(ContractError::SyncDriftUnresolved {
                stream_id: stream_id.to_string(),
                drift: divergence,
            }),
        }
    }

    /// Snapshot of the controller's counters
    pub fn stats(&self) -> SyncStats {
        let mut stats = self.stats.clone();
        stats.unresolved = self
            .overlay_ids()
            .into_iter()
            .filter(|id| self.overlay_status(id) == Some(OverlayStatus::Unresolved))
            .collect();
        stats
    }

    // ===== Internals =====

    fn forwarder(&self) -> contracts::StreamEventCallback {
        let tx = self.events_tx.clone();
        Arc::new(move |notification: StreamNotification| {
            // Receiver is gone only after the controller is dropped.
            let _ = tx.send(notification);
        })
    }

    fn check_master(&self, master: &dyn StreamHandle) -> Result<()> {
        match (&self.state, &self.master_id) {
            (ControllerState::TornDown, _) => Err(SyncError::TornDown),
            (ControllerState::Idle, _) | (_, None) => Err(SyncError::NotAttached),
            (ControllerState::Attached, Some(expected)) if expected != master.stream_id() => {
                Err(SyncError::MasterMismatch {
                    expected: expected.to_string(),
                    actual: master.stream_id().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Rate, position and play state of one overlay from the master
    fn align(&mut self, master: &dyn StreamHandle, entry: &mut AttachedOverlay, target: f64) {
        let rate = master.rate();
        if entry.handle.rate() != rate {
            entry.handle.set_rate(rate);
            self.stats.rate_updates += 1;
        }
        let stream_id = entry.handle.stream_id().clone();
        snap_one(&stream_id, entry, target, &mut self.stats);
        if master.is_playing() {
            try_play(&stream_id, entry.handle.as_mut(), &mut self.stats);
        } else {
            entry.handle.pause();
        }
    }

    /// Hard-snap every overlay onto the master's frame, no threshold check
    fn snap_all(&mut self, master: &dyn StreamHandle) {
        let target = self.clock.snap(master.position());
        for (stream_id, entry) in &mut self.overlays {
            snap_one(stream_id, entry, target, &mut self.stats);
        }
        trace!(target, overlays = self.overlays.len(), "overlays snapped");
    }

    /// Start the loop when wanted, stop it otherwise
    fn refresh_loop(&mut self, master: &dyn StreamHandle) {
        if correction_wanted(master.is_playing(), master.rate(), self.overlays.len()) {
            if self.correction.start() {
                debug!(rate = master.rate(), "correction loop started");
                metrics::counter!("overlay_sync_correction_loop_starts_total").increment(1);
            }
        } else if !master.is_playing() || master.rate() == contracts::UNIT_RATE {
            if self.correction.cancel() {
                debug!(rate = master.rate(), "correction loop cancelled");
            }
        }
    }
}

fn snap_one(stream_id: &StreamId, entry: &mut AttachedOverlay, target: f64, stats: &mut SyncStats) {
    match entry.handle.seek(target) {
        Ok(()) => {
            stats.snaps += 1;
            metrics::counter!("overlay_sync_snaps_total").increment(1);
            if entry.status == OverlayStatus::Unresolved && entry.handle.ready_state().is_ready() {
                entry.status = OverlayStatus::Synced;
                info!(%stream_id, "overlay back in sync");
            }
        }
        Err(e) => {
            stats.seek_failures += 1;
            metrics::counter!("overlay_sync_seek_failures_total").increment(1);
            warn!(%stream_id, error = %e, "overlay seek failed");
        }
    }
}

fn try_play(stream_id: &StreamId, overlay: &mut dyn StreamHandle, stats: &mut SyncStats) {
    if overlay.is_playing() {
        return;
    }
    overlay.set_muted(true);
    if let Err(e) = overlay.play() {
        stats.play_failures += 1;
        metrics::counter!("overlay_sync_play_failures_total").increment(1);
        warn!(%stream_id, error = %e, "overlay failed to play");
    }
}

fn event_kind(event: &StreamEvent) -> &'static str {
    match event {
        StreamEvent::Loaded => "loaded",
        StreamEvent::PlayingStarted => "playing_started",
        StreamEvent::PlayingStopped => "playing_stopped",
        StreamEvent::PositionJumped { .. } => "position_jumped",
        StreamEvent::RateChanged { .. } => "rate_changed",
        StreamEvent::Error { .. } => "error",
    }
}
