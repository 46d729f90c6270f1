//! Read-aloud playback controller.
//!
//! [`PlaybackController`] is a single-owner state machine over one
//! [`SpeechEngineAdapter`]. User operations (`play`, `stop`, `restart`,
//! `set_rate`) return immediately; their effects show up later as signals
//! pumped through [`PlaybackController::next_signal`] and
//! [`PlaybackController::dispatch`]:
//!
//! * engine events (boundary, end, error), filtered by session handle,
//! * the settling timer that gates every `speak` after a `cancel`,
//! * queued follow-ups, such as the resume owed after a rate change.
//!
//! ```text
//! Idle/Stopped --play--> (settle) --speak--> Playing
//! Playing --stop--> Stopped          Playing --end--> Idle (offset 0)
//! Playing --error--> Idle            any --restart--> (settle) --> Playing from 0
//! Playing/Stopped --set_rate--> RateChanging --rate applied--> (settle) --> Playing
//! ```

pub mod runtime;
pub mod state;

pub use runtime::{Narrator, NarratorCommand, NarratorHandle};
pub use state::{PlaybackPhase, PlaybackSnapshot};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

use crate::config::NarrationConfig;
use crate::engine::{
    EngineEvent, EngineEventKind, SessionHandle, SpeechEngine, SpeechEngineAdapter,
};
use crate::error::{NarrationError, Result};
use crate::rate::RateLabel;

pub use crate::config::DEFAULT_SETTLE_DELAY;

/// Something the controller reacts to after an operation has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Engine(EngineEvent),
    /// The settling delay for the start tagged `ticket` has passed.
    SettleElapsed { ticket: u64 },
    /// A rate change has been stored; resume if one is still owed.
    RateApplied,
}

#[derive(Debug, Clone, Copy)]
struct PendingStart {
    ticket: u64,
    due: Instant,
    from_offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    handle: SessionHandle,
    from_offset: usize,
}

/// State machine for one narration text.
pub struct PlaybackController {
    adapter: SpeechEngineAdapter,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    settle_delay: Duration,
    text: Option<Arc<str>>,
    text_len: usize,
    offset: usize,
    rate: RateLabel,
    phase: PlaybackPhase,
    pending_rate_change: bool,
    pending_start: Option<PendingStart>,
    session: Option<ActiveSession>,
    follow_ups: VecDeque<Signal>,
    next_ticket: u64,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
}

impl PlaybackController {
    /// Controller with the default settling delay, `ja-JP` and rate `1.0x`.
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_config(engine, &NarrationConfig::default())
    }

    pub fn with_config(engine: Arc<dyn SpeechEngine>, config: &NarrationConfig) -> Self {
        let (adapter, events_rx) = SpeechEngineAdapter::new(engine, config.language.clone());
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot {
            rate: config.rate,
            ..Default::default()
        });
        Self {
            adapter,
            events_rx,
            settle_delay: config.settle_delay(),
            text: None,
            text_len: 0,
            offset: 0,
            rate: config.rate,
            phase: PlaybackPhase::Idle,
            pending_rate_change: false,
            pending_start: None,
            session: None,
            follow_ups: VecDeque::new(),
            next_ticket: 0,
            snapshot_tx,
        }
    }

    /// Replace the settling delay.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Receive a fresh snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.phase,
            offset: self.offset,
            text_len: self.text_len,
            rate: self.rate,
            is_playing: self.phase == PlaybackPhase::Playing,
            pending_rate_change: self.pending_rate_change,
            starting: self.pending_start.is_some(),
            has_text: self.text.is_some(),
            session: self.session.map(|s| s.handle),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rate(&self) -> RateLabel {
        self.rate
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    /// Playing, or about to be once the settling delay passes.
    pub fn is_active(&self) -> bool {
        self.is_playing() || self.pending_start.is_some()
    }

    /// Install the narration text. Any running session is cancelled and the
    /// controller goes back to `Idle` at offset 0. Empty text leaves the
    /// controls disabled.
    pub fn load_text(&mut self, text: impl Into<String>) {
        let text: String = text.into();
        self.halt();
        self.pending_rate_change = false;
        self.follow_ups.clear();
        self.phase = PlaybackPhase::Idle;
        self.offset = 0;
        if text.is_empty() {
            self.text = None;
            self.text_len = 0;
        } else {
            self.text_len = text.chars().count();
            self.text = Some(Arc::from(text));
        }
        tracing::debug!(text_len = self.text_len, "narration text loaded");
        self.publish();
    }

    /// Start narrating from the retained offset.
    ///
    /// Rejected while already playing or starting: a second press of the
    /// same button means stop, and the caller should say so.
    pub fn play(&mut self) -> Result<()> {
        self.require_text()?;
        if self.is_active() {
            return Err(NarrationError::InvalidState(
                "narration already playing; stop it instead".into(),
            ));
        }
        self.pending_rate_change = false;
        self.schedule_start(self.offset);
        Ok(())
    }

    /// The single play/stop button.
    pub fn toggle(&mut self) -> Result<()> {
        if self.is_active() {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Stop and keep the offset for a later resume. No-op when nothing is
    /// playing or owed.
    pub fn stop(&mut self) {
        if !self.is_active() && self.phase != PlaybackPhase::RateChanging {
            return;
        }
        self.halt();
        self.pending_rate_change = false;
        self.phase = PlaybackPhase::Stopped;
        tracing::debug!(offset = self.offset, "playback stopped");
        self.publish();
    }

    /// Narrate again from offset 0, whatever the current state.
    pub fn restart(&mut self) -> Result<()> {
        self.require_text()?;
        self.pending_rate_change = false;
        self.offset = 0;
        self.schedule_start(0);
        Ok(())
    }

    /// Change the rate without losing position.
    ///
    /// While idle the label is only stored for the next play. Otherwise the
    /// session is cancelled and a resume from the retained offset is queued.
    pub fn set_rate(&mut self, rate: RateLabel) {
        if self.phase == PlaybackPhase::Idle && self.pending_start.is_none() {
            self.rate = rate;
            tracing::debug!(%rate, "rate stored for next play");
            self.publish();
            return;
        }
        self.halt();
        self.rate = rate;
        self.pending_rate_change = true;
        self.phase = PlaybackPhase::RateChanging;
        self.follow_ups.push_back(Signal::RateApplied);
        tracing::debug!(%rate, offset = self.offset, "rate change pending");
        self.publish();
    }

    /// Tear down for good: cancel the engine and forget anything owed.
    pub fn close(&mut self) {
        if self.is_active() || self.phase == PlaybackPhase::RateChanging {
            self.halt();
        }
        self.pending_rate_change = false;
        self.follow_ups.clear();
        self.phase = PlaybackPhase::Idle;
        self.publish();
    }

    /// Wait for the next signal: a queued follow-up, an engine event or the
    /// settling timer, whichever comes first.
    pub async fn next_signal(&mut self) -> Option<Signal> {
        if let Some(signal) = self.follow_ups.pop_front() {
            return Some(signal);
        }
        match self.pending_start {
            Some(PendingStart { ticket, due, .. }) => tokio::select! {
                event = self.events_rx.recv() => event.map(Signal::Engine),
                _ = time::sleep_until(due) => Some(Signal::SettleElapsed { ticket }),
            },
            None => self.events_rx.recv().await.map(Signal::Engine),
        }
    }

    /// Apply one signal.
    pub fn dispatch(&mut self, signal: Signal) {
        match signal {
            Signal::Engine(event) => self.on_engine_event(event),
            Signal::SettleElapsed { ticket } => self.on_settled(ticket),
            Signal::RateApplied => self.on_rate_applied(),
        }
    }

    /// Wait for and apply one signal. Returns `false` if the event stream
    /// is closed.
    pub async fn step(&mut self) -> bool {
        match self.next_signal().await {
            Some(signal) => {
                self.dispatch(signal);
                true
            }
            None => false,
        }
    }

    /// Apply every follow-up and engine event that is ready now, without
    /// waiting. Returns how many signals were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            if let Some(signal) = self.follow_ups.pop_front() {
                self.dispatch(signal);
            } else if let Ok(event) = self.events_rx.try_recv() {
                self.on_engine_event(event);
            } else {
                return applied;
            }
            applied += 1;
        }
    }

    /// Run until no start is owed: ready signals are applied and the
    /// settling timer is awaited.
    pub async fn settle(&mut self) {
        loop {
            self.drain();
            if self.pending_start.is_none() {
                return;
            }
            if !self.step().await {
                return;
            }
        }
    }

    fn require_text(&self) -> Result<()> {
        match self.text {
            Some(_) => Ok(()),
            None => Err(NarrationError::no_text()),
        }
    }

    /// Cancel the engine and drop any scheduled start.
    fn halt(&mut self) {
        self.pending_start = None;
        self.session = None;
        self.adapter.cancel();
    }

    /// Cancel defensively, then speak from `from_offset` once the engine has
    /// had time to let go of the previous session.
    fn schedule_start(&mut self, from_offset: usize) {
        self.halt();
        if self.phase == PlaybackPhase::Playing {
            self.phase = PlaybackPhase::Stopped;
        }
        self.next_ticket += 1;
        self.pending_start = Some(PendingStart {
            ticket: self.next_ticket,
            due: Instant::now() + self.settle_delay,
            from_offset,
        });
        tracing::debug!(
            from_offset,
            settle_ms = self.settle_delay.as_millis() as u64,
            "start scheduled"
        );
        self.publish();
    }

    fn on_settled(&mut self, ticket: u64) {
        let Some(pending) = self.pending_start else {
            return;
        };
        if pending.ticket != ticket {
            tracing::debug!(ticket, "superseded start ignored");
            return;
        }
        self.pending_start = None;
        let Some(text) = self.text.clone() else {
            return;
        };

        match self
            .adapter
            .speak(&text, self.rate.engine_value(), pending.from_offset)
        {
            Ok(handle) => {
                self.session = Some(ActiveSession {
                    handle,
                    from_offset: pending.from_offset,
                });
                self.offset = pending.from_offset;
                self.phase = PlaybackPhase::Playing;
            }
            Err(error) => {
                tracing::warn!(%error, "speak failed");
                self.phase = PlaybackPhase::Idle;
            }
        }
        self.publish();
    }

    fn on_rate_applied(&mut self) {
        if !self.pending_rate_change {
            return;
        }
        self.pending_rate_change = false;
        if self.text.is_none() {
            self.phase = PlaybackPhase::Idle;
            self.publish();
            return;
        }
        self.schedule_start(self.offset);
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        let active = match self.session {
            Some(active)
                if active.handle == event.session && self.adapter.is_current(event.session) =>
            {
                active
            }
            _ => {
                tracing::debug!(session = %event.session, kind = ?event.kind, "stale engine event dropped");
                return;
            }
        };

        match event.kind {
            EngineEventKind::Boundary { char_index } => {
                self.offset = (active.from_offset + char_index).min(self.text_len);
            }
            EngineEventKind::End => {
                self.adapter.release(active.handle);
                self.session = None;
                self.phase = PlaybackPhase::Idle;
                self.offset = 0;
                tracing::debug!(session = %active.handle, "narration finished");
            }
            EngineEventKind::Error { message } => {
                self.adapter.release(active.handle);
                self.session = None;
                self.phase = PlaybackPhase::Idle;
                tracing::warn!(session = %active.handle, %message, "speech engine error");
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if self.session.is_some() || self.pending_start.is_some() {
            self.adapter.cancel();
        }
    }
}
