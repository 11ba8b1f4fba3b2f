//! Signed playback URLs expire. Players mounted here swap in a fresh URL once
//! per failure instead of looping on a dead one.

mod modal;
mod recovery;

use serde::Serialize;

pub use modal::ModalPlayback;
pub use recovery::PlaybackRecovery;

pub const DEGRADED_TITLE: &str = "Error al cargar el video";

/// The handful of media-element operations recovery needs.
pub trait Player: Send {
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    fn reload(&mut self);
    fn is_paused(&self) -> bool;
    fn play(&mut self) -> Result<(), String>;
    fn pause(&mut self);
    /// Placeholder background plus a descriptive title.
    fn show_degraded(&mut self, title: &str);
    fn clear_degraded(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    /// A fresh URL was loaded; `resumed` when playback was restarted.
    Refreshed { resumed: bool },
    Degraded,
    /// The single retry failed and the player was left as is.
    Abandoned,
    /// Nothing to do: no video bound or the retry was already spent.
    Ignored,
}
