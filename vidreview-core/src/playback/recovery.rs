use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::PlaybackUrlSource;

use super::{Player, RecoveryAction, DEGRADED_TITLE};

/// Detail-view player: one refresh per failure cycle, re-armed once the
/// cooldown has passed since the cycle finished.
pub struct PlaybackRecovery<P> {
    player: P,
    video_id: Option<i64>,
    source: Arc<dyn PlaybackUrlSource>,
    cooldown: Duration,
    retrying: bool,
    rearm_at: Option<Instant>,
}

impl<P: fmt::Debug> fmt::Debug for PlaybackRecovery<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackRecovery")
            .field("player", &self.player)
            .field("video_id", &self.video_id)
            .field("cooldown", &self.cooldown)
            .field("retrying", &self.retrying)
            .finish()
    }
}

impl<P: Player> PlaybackRecovery<P> {
    pub fn mount(
        player: P,
        video_id: Option<i64>,
        source: Arc<dyn PlaybackUrlSource>,
        cooldown: Duration,
    ) -> Self {
        Self {
            player,
            video_id,
            source,
            cooldown,
            retrying: false,
            rearm_at: None,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }

    pub fn is_retrying(&self) -> bool {
        self.retrying && !self.cooldown_elapsed()
    }

    pub fn on_metadata_loaded(&mut self) {
        self.player.clear_degraded();
    }

    pub async fn on_playback_error(&mut self) -> RecoveryAction {
        if self.retrying && self.cooldown_elapsed() {
            self.retrying = false;
            self.rearm_at = None;
        }
        if self.retrying {
            debug!(video_id = ?self.video_id, "playback failed again within cooldown");
            self.player.show_degraded(DEGRADED_TITLE);
            return RecoveryAction::Degraded;
        }

        self.retrying = true;
        let action = match self.refresh().await {
            Some(resumed) => RecoveryAction::Refreshed { resumed },
            None => {
                self.player.show_degraded(DEGRADED_TITLE);
                RecoveryAction::Degraded
            }
        };
        self.rearm_at = Some(Instant::now() + self.cooldown);
        action
    }

    fn cooldown_elapsed(&self) -> bool {
        self.rearm_at
            .map(|at| Instant::now() >= at)
            .unwrap_or(false)
    }

    /// `Some(resumed)` when a new source was loaded.
    async fn refresh(&mut self) -> Option<bool> {
        let video_id = self.video_id?;
        let url = match self.source.signed_playback_url(video_id).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                warn!(video_id, "signed url response carried no url");
                return None;
            }
            Err(err) => {
                warn!(video_id, error = %err, "could not refresh signed playback url");
                return None;
            }
        };
        let was_playing = !self.player.is_paused();
        self.player.set_source(&url);
        self.player.reload();
        let mut resumed = false;
        if was_playing {
            match self.player.play() {
                Ok(()) => resumed = true,
                Err(err) => debug!(video_id, error = %err, "resume after refresh refused"),
            }
        }
        info!(video_id, resumed, "swapped in fresh signed playback url");
        Some(resumed)
    }
}
