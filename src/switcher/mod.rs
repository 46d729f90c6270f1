//! Exclusive narration across a list of items.
//!
//! Every item on an article list has its own play button, but there is one
//! narration channel. [`TargetSwitcher`] owns the only [`PlaybackController`]
//! and remembers which item it is narrating, so at most one item is ever
//! reported as playing. Switching items always cancels before the next
//! speak, with the settling delay in between.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::SpeechEngine;
use crate::error::{NarrationError, Result};
use crate::playback::{PlaybackController, PlaybackPhase, PlaybackSnapshot, Signal};
use crate::rate::RateLabel;

/// Identifies a narratable item (an article id, a summary id...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for TargetId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// An item that can be narrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationTarget {
    pub id: TargetId,
    pub text: String,
}

impl NarrationTarget {
    pub fn new(id: impl Into<TargetId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Per-item state for rendering its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Idle,
    /// Waiting out the settling delay before speaking.
    Starting,
    Playing,
}

/// What a toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The target was narrating and is now stopped.
    Stopped,
    /// Nothing was active; the target starts from the beginning.
    Started,
    /// Another target was cancelled in favour of this one.
    Switched { from: TargetId },
}

/// Sole arbiter of the shared narration channel.
pub struct TargetSwitcher {
    controller: PlaybackController,
    targets: HashMap<TargetId, NarrationTarget>,
    active: Option<TargetId>,
}

impl TargetSwitcher {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_controller(PlaybackController::new(engine))
    }

    pub fn with_controller(controller: PlaybackController) -> Self {
        Self {
            controller,
            targets: HashMap::new(),
            active: None,
        }
    }

    /// Remember a target so it can be toggled by id alone.
    pub fn register(&mut self, target: NarrationTarget) {
        self.targets.insert(target.id.clone(), target);
    }

    pub fn target(&self, id: &TargetId) -> Option<&NarrationTarget> {
        self.targets.get(id)
    }

    /// Toggle a registered target.
    pub fn toggle_registered(&mut self, id: &TargetId) -> Result<ToggleOutcome> {
        let text = self
            .targets
            .get(id)
            .map(|target| target.text.clone())
            .ok_or_else(|| NarrationError::InvalidArgument(format!("unknown target '{id}'")))?;
        self.toggle(id.clone(), text)
    }

    /// Play or stop `id`, redirecting narration away from whatever target
    /// holds the channel.
    pub fn toggle(&mut self, id: impl Into<TargetId>, text: impl Into<String>) -> Result<ToggleOutcome> {
        let id = id.into();
        let text = text.into();
        if text.is_empty() {
            return Err(NarrationError::no_text());
        }

        if self.active.as_ref() == Some(&id) && self.holds_channel() {
            self.controller.stop();
            self.active = None;
            tracing::debug!(target_id = %id, "target stopped");
            return Ok(ToggleOutcome::Stopped);
        }

        let previous = self.active.take();
        // Loading cancels the previous session before anything new is scheduled.
        self.controller.load_text(text);
        self.controller.play()?;
        self.active = Some(id.clone());

        match previous {
            Some(from) if from != id => {
                tracing::debug!(from = %from, to = %id, "narration switched");
                Ok(ToggleOutcome::Switched { from })
            }
            _ => {
                tracing::debug!(target_id = %id, "target started");
                Ok(ToggleOutcome::Started)
            }
        }
    }

    /// Stop whatever is narrating.
    pub fn stop(&mut self) {
        self.controller.stop();
        self.active = None;
    }

    /// Change the rate of the active narration. With no active target the
    /// label is only kept for the next toggle.
    pub fn set_rate(&mut self, rate: RateLabel) {
        if self.active.is_none() {
            // A stopped controller would otherwise resume the old item.
            self.controller.close();
        }
        self.controller.set_rate(rate);
    }

    pub fn active(&self) -> Option<&TargetId> {
        self.active.as_ref()
    }

    pub fn status(&self, id: &TargetId) -> TargetStatus {
        if self.active.as_ref() != Some(id) {
            return TargetStatus::Idle;
        }
        if self.controller.is_playing() {
            TargetStatus::Playing
        } else if self.holds_channel() {
            TargetStatus::Starting
        } else {
            TargetStatus::Idle
        }
    }

    /// Ids of targets currently reported as playing. Never more than one.
    pub fn playing(&self) -> Vec<&TargetId> {
        self.active
            .iter()
            .filter(|id| self.status(id) == TargetStatus::Playing)
            .collect()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.controller.snapshot()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub async fn next_signal(&mut self) -> Option<Signal> {
        self.controller.next_signal().await
    }

    /// Apply a signal and release the active target once its narration
    /// has ended or failed.
    pub fn dispatch(&mut self, signal: Signal) {
        self.controller.dispatch(signal);
        self.release_finished();
    }

    pub async fn step(&mut self) -> bool {
        let progressed = self.controller.step().await;
        self.release_finished();
        progressed
    }

    pub fn drain(&mut self) -> usize {
        let applied = self.controller.drain();
        self.release_finished();
        applied
    }

    pub async fn settle(&mut self) {
        self.controller.settle().await;
        self.release_finished();
    }

    /// Cancel narration for good.
    pub fn close(&mut self) {
        self.controller.close();
        self.active = None;
    }

    /// Playing, waiting to start, or between the cancel and resume of a
    /// rate change.
    fn holds_channel(&self) -> bool {
        self.controller.is_active() || self.controller.phase() == PlaybackPhase::RateChanging
    }

    fn release_finished(&mut self) {
        if self.active.is_some()
            && self.controller.phase() == PlaybackPhase::Idle
            && !self.controller.is_active()
        {
            if let Some(id) = self.active.take() {
                tracing::debug!(target_id = %id, "target finished");
            }
        }
    }
}
