use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiResult, PlaybackUrlSource};

use super::{Player, RecoveryAction};

/// List-view preview: every opening fetches a fresh URL and gets a single
/// in-modal retry that is not re-armed until the next opening.
pub struct ModalPlayback<P> {
    player: P,
    source: Arc<dyn PlaybackUrlSource>,
    current: Option<i64>,
    retried: bool,
    loading: bool,
}

impl<P: fmt::Debug> fmt::Debug for ModalPlayback<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalPlayback")
            .field("player", &self.player)
            .field("current", &self.current)
            .field("retried", &self.retried)
            .field("loading", &self.loading)
            .finish()
    }
}

impl<P: Player> ModalPlayback<P> {
    pub fn new(player: P, source: Arc<dyn PlaybackUrlSource>) -> Self {
        Self {
            player,
            source,
            current: None,
            retried: false,
            loading: false,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns `false` when the backend had no url to play; the modal stays
    /// closed in that case.
    pub async fn open(&mut self, video_id: i64) -> ApiResult<bool> {
        let Some(url) = self.source.signed_playback_url(video_id).await? else {
            debug!(video_id, "no playback url, modal not opened");
            return Ok(false);
        };
        self.reset_player();
        self.player.set_source(&url);
        self.current = Some(video_id);
        self.retried = false;
        self.loading = true;
        Ok(true)
    }

    pub fn on_metadata_loaded(&mut self) {
        self.loading = false;
    }

    pub async fn on_playback_error(&mut self) -> RecoveryAction {
        let Some(video_id) = self.current else {
            return RecoveryAction::Ignored;
        };
        if self.retried {
            return RecoveryAction::Ignored;
        }
        self.retried = true;
        self.loading = true;
        match self.source.signed_playback_url(video_id).await {
            Ok(Some(url)) => {
                self.player.set_source(&url);
                self.player.reload();
                RecoveryAction::Refreshed { resumed: false }
            }
            Ok(None) => {
                self.loading = false;
                RecoveryAction::Abandoned
            }
            Err(err) => {
                warn!(video_id, error = %err, "modal playback refresh failed");
                self.loading = false;
                RecoveryAction::Abandoned
            }
        }
    }

    pub fn close(&mut self) {
        self.reset_player();
        self.loading = false;
        self.current = None;
    }

    fn reset_player(&mut self) {
        self.player.pause();
        self.player.clear_source();
        self.player.reload();
    }
}
