//! Observable playback state.

use serde::Serialize;
use strum::Display;

use crate::engine::SessionHandle;
use crate::rate::RateLabel;

/// Where a narration session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlaybackPhase {
    /// Nothing narrated yet, or the last utterance ended or failed.
    #[default]
    Idle,
    Playing,
    /// Stopped by the listener; `offset` is where play resumes.
    Stopped,
    /// Stopped by a rate change; a resume at `offset` is owed.
    RateChanging,
}

/// What a front-end renders. Published after every transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    /// Char offset into the narration text.
    pub offset: usize,
    pub text_len: usize,
    pub rate: RateLabel,
    pub is_playing: bool,
    pub pending_rate_change: bool,
    /// A speak is scheduled behind the settling delay.
    pub starting: bool,
    /// Controls are enabled only once text is loaded.
    pub has_text: bool,
    pub session: Option<SessionHandle>,
}

impl PlaybackSnapshot {
    /// Label for the play/stop button.
    pub fn button_label(&self) -> &'static str {
        if self.is_playing || self.starting {
            "stop"
        } else {
            "play"
        }
    }
}
