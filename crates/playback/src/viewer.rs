//! Viewer: video selection and overlay toggling over a preloaded cache.

use contracts::{MediaManifest, OverlayEntry, StreamBackend, StreamId, SyncStats, VideoEntry};
use media_factory::MediaCache;
use tracing::{info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::session::PlaybackSession;

/// Overlay viewer
///
/// Owns the media cache and at most one playback session. Streams move from
/// the cache into the session on selection/toggle and back again on release.
pub struct Viewer<B: StreamBackend> {
    manifest: MediaManifest,
    cache: MediaCache<B>,
    session: Option<PlaybackSession>,
    selected: Option<StreamId>,
    age_group: Option<String>,
    /// Stats of sessions that ended through a video switch
    retired: Vec<SyncStats>,
}

impl<B: StreamBackend> Viewer<B> {
    /// Create a viewer and preload every resource of the manifest
    #[instrument(name = "viewer_new", skip(manifest, backend), fields(videos = manifest.videos.len()))]
    pub fn new(manifest: MediaManifest, backend: B) -> Self {
        let mut cache = MediaCache::new(backend);
        cache.preload_manifest(&manifest);
        Self {
            manifest,
            cache,
            session: None,
            selected: None,
            age_group: None,
            retired: Vec::new(),
        }
    }

    /// Make `video_id` the master
    ///
    /// The previous session is ended and all its streams go back to the cache.
    /// Active overlays are cleared. Autoplay refusal is logged, not returned.
    /// Selecting the current video is a no-op.
    #[instrument(name = "viewer_select_video", skip(self))]
    pub fn select_video(&mut self, video_id: &str) -> Result<()> {
        let video = self
            .manifest
            .video(video_id)
            .ok_or_else(|| PlaybackError::UnknownVideo {
                video_id: video_id.to_string(),
            })?;
        if self.selected.as_ref().is_some_and(|id| id == video_id) {
            return Ok(());
        }
        let master_id = video.id.clone();
        let title = video.title.clone();

        self.release_session();

        let master = self.cache.checkout(&master_id)?;
        let mut session = PlaybackSession::new(master, &self.manifest.playback)?;

        if self.manifest.playback.autoplay_on_select {
            if let Err(e) = session.play() {
                warn!(error = %e, "autoplay refused, waiting for user play");
            }
        }

        info!(%title, "video selected");
        metrics::counter!("overlay_sync_video_selections_total").increment(1);
        self.session = Some(session);
        self.selected = Some(master_id);
        Ok(())
    }

    /// Attach the overlay if inactive, detach it otherwise
    ///
    /// Returns whether the overlay is active afterwards.
    #[instrument(name = "viewer_toggle_overlay", skip(self))]
    pub fn toggle_overlay(&mut self, overlay_id: &str) -> Result<bool> {
        let video = self.selected_video().ok_or(PlaybackError::NoVideoSelected)?;
        if video.overlay(overlay_id).is_none() {
            return Err(PlaybackError::UnknownOverlay {
                video_id: video.id.to_string(),
                overlay_id: overlay_id.to_string(),
            });
        }
        let session = self
            .session
            .as_mut()
            .ok_or(PlaybackError::NoVideoSelected)?;

        if let Some(overlay) = session.detach_overlay(overlay_id) {
            self.cache.checkin(overlay);
            metrics::counter!("overlay_sync_overlay_toggles_total", "action" => "detach").increment(1);
            return Ok(false);
        }

        let overlay = self.cache.checkout(overlay_id)?;
        match session.attach_overlay(overlay) {
            Ok(replaced) => {
                if let Some(replaced) = replaced {
                    self.cache.checkin(replaced);
                }
                metrics::counter!("overlay_sync_overlay_toggles_total", "action" => "attach").increment(1);
                Ok(true)
            }
            Err(e) => {
                let (reason, overlay) = e.into_parts();
                self.cache.checkin(overlay);
                Err(reason.into())
            }
        }
    }

    /// Distinct age groups across the manifest, first-seen order
    pub fn age_groups(&self) -> Vec<String> {
        self.manifest.age_groups()
    }

    /// Restrict `available_overlays` to one age group (`None` shows all)
    pub fn set_age_group(&mut self, age_group: Option<&str>) -> Result<()> {
        if let Some(group) = age_group {
            if !self.age_groups().iter().any(|g| g == group) {
                return Err(PlaybackError::UnknownAgeGroup {
                    age_group: group.to_string(),
                });
            }
        }
        self.age_group = age_group.map(str::to_string);
        Ok(())
    }

    pub fn age_group(&self) -> Option<&str> {
        self.age_group.as_deref()
    }

    /// Overlays of the selected video matching the age group filter
    pub fn available_overlays(&self) -> Vec<&OverlayEntry> {
        let Some(video) = self.selected_video() else {
            return Vec::new();
        };
        match self.age_group.as_deref() {
            Some(group) => video.overlays_for_age_group(group).collect(),
            None => video.overlays.iter().collect(),
        }
    }

    /// Active overlay ids, sorted
    pub fn active_overlays(&self) -> Vec<StreamId> {
        self.session
            .as_ref()
            .map(|s| s.controller().overlay_ids())
            .unwrap_or_default()
    }

    pub fn selected_video(&self) -> Option<&VideoEntry> {
        self.selected
            .as_ref()
            .and_then(|id| self.manifest.video(id))
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.session.as_mut()
    }

    pub fn manifest(&self) -> &MediaManifest {
        &self.manifest
    }

    pub fn cache(&self) -> &MediaCache<B> {
        &self.cache
    }

    /// Display-frame tick for the current session
    pub fn on_display_frame(&mut self) -> usize {
        self.session
            .as_mut()
            .map(PlaybackSession::on_display_frame)
            .unwrap_or(0)
    }

    /// Stats of every session so far, the current one last
    pub fn session_stats(&self) -> Vec<SyncStats> {
        let mut all = self.retired.clone();
        if let Some(session) = &self.session {
            all.push(session.stats());
        }
        all
    }

    /// End the current session and return every stream to the cache
    pub fn close(&mut self) {
        self.release_session();
    }

    fn release_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.retired.push(session.stats());
        let (master, overlays) = session.end();
        self.cache.checkin(master);
        for overlay in overlays {
            self.cache.checkin(overlay);
        }
        self.selected = None;
    }
}
