//! Speech engine surface and the adapter that owns the narration resource.
//!
//! There is exactly one narration channel per process. Every `speak` displaces
//! whatever was playing, and `cancel` is a request, not an acknowledgement:
//! an engine may still deliver a trailing event for a session after it was
//! cancelled. Events therefore carry the [`SessionHandle`] they belong to and
//! the adapter decides which handle is still current.

pub mod command;
pub mod recording;
pub mod simulated;

pub use command::CommandEngine;
pub use recording::{EngineCall, RecordingEngine};
pub use simulated::SimulatedEngine;

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{NarrationError, Result};

/// Identifies one utterance handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One unit of narration as the engine sees it.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Utterance {
    pub session: SessionHandle,
    /// Text to narrate. Already sliced to the resume offset.
    #[builder(into)]
    pub text: String,
    /// Engine-native rate multiplier.
    pub rate: f32,
    #[builder(into)]
    pub lang: String,
}

/// What an engine reports about a running utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEventKind {
    /// Narration reached `char_index`, counted in chars from the start of
    /// the utterance text (not the full narration text).
    Boundary { char_index: usize },
    End,
    Error { message: String },
}

/// An engine event stamped with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub session: SessionHandle,
    pub kind: EngineEventKind,
}

/// Callback channel handed to an engine for one utterance.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    session: SessionHandle,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn boundary(&self, char_index: usize) {
        self.emit(EngineEventKind::Boundary { char_index });
    }

    pub fn end(&self) {
        self.emit(EngineEventKind::End);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EngineEventKind::Error {
            message: message.into(),
        });
    }

    fn emit(&self, kind: EngineEventKind) {
        // The controller may already be gone; nobody is left to care.
        let _ = self.tx.send(EngineEvent {
            session: self.session,
            kind,
        });
    }
}

/// A platform text-to-speech facility.
///
/// Implementations must not block: `speak` starts narration and returns,
/// progress is reported through the sink.
pub trait SpeechEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Start narrating, displacing any utterance still running.
    fn speak(&self, utterance: Utterance, events: EngineEventSink) -> Result<()>;

    /// Ask the engine to stop. May return before audio actually stops.
    fn cancel(&self);
}

/// Owns the process-wide narration resource on behalf of one controller.
pub struct SpeechEngineAdapter {
    engine: Arc<dyn SpeechEngine>,
    language: String,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    next_session: u64,
    current: Option<SessionHandle>,
}

impl fmt::Debug for SpeechEngineAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechEngineAdapter")
            .field("engine", &self.engine.name())
            .field("language", &self.language)
            .field("current", &self.current)
            .finish()
    }
}

impl SpeechEngineAdapter {
    /// Wrap an engine. The receiver yields every event the engine reports,
    /// including late ones for sessions that are no longer current.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        language: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let adapter = Self {
            engine,
            language: language.into(),
            events_tx,
            next_session: 1,
            current: None,
        };
        (adapter, events_rx)
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Narrate `text` from char offset `from_offset` at engine rate `rate`.
    pub fn speak(&mut self, text: &str, rate: f32, from_offset: usize) -> Result<SessionHandle> {
        let tail = char_tail(text, from_offset).ok_or_else(|| {
            NarrationError::InvalidArgument(format!(
                "offset {from_offset} is past the end of a {} char text",
                text.chars().count()
            ))
        })?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(NarrationError::InvalidArgument(format!(
                "engine rate must be positive, got {rate}"
            )));
        }

        let session = SessionHandle(self.next_session);
        self.next_session += 1;

        let utterance = Utterance::builder()
            .session(session)
            .text(tail)
            .rate(rate)
            .lang(self.language.as_str())
            .build();
        let sink = EngineEventSink {
            session,
            tx: self.events_tx.clone(),
        };

        self.current = Some(session);
        if let Err(error) = self.engine.speak(utterance, sink) {
            self.current = None;
            return Err(error);
        }
        tracing::debug!(
            engine = self.engine.name(),
            %session,
            from_offset,
            rate,
            "speak issued"
        );
        Ok(session)
    }

    /// Request a stop. The current handle is forgotten immediately.
    pub fn cancel(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::debug!(engine = self.engine.name(), %session, "cancel issued");
        }
        self.engine.cancel();
    }

    /// Mark `session` as finished after its `end` or `error`.
    pub fn release(&mut self, session: SessionHandle) {
        if self.current == Some(session) {
            self.current = None;
        }
    }

    pub fn is_current(&self, session: SessionHandle) -> bool {
        self.current == Some(session)
    }

    pub fn current(&self) -> Option<SessionHandle> {
        self.current
    }
}

/// The part of `text` starting at char offset `offset`, or `None` when the
/// offset is past the end. `offset == len` yields the empty string.
pub fn char_tail(text: &str, offset: usize) -> Option<&str> {
    if offset == 0 {
        return Some(text);
    }
    match text.char_indices().nth(offset) {
        Some((byte, _)) => Some(&text[byte..]),
        None if text.chars().count() == offset => Some(""),
        None => None,
    }
}
