//! Engine that records calls and lets the caller fire events by hand.

use std::sync::{Mutex, MutexGuard};

use super::{EngineEventSink, SessionHandle, SpeechEngine, Utterance};
use crate::error::{NarrationError, Result};

/// A call the engine received.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Speak {
        session: SessionHandle,
        text: String,
        rate: f32,
        lang: String,
    },
    Cancel,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<EngineCall>,
    sinks: Vec<EngineEventSink>,
    fail_next: Option<String>,
}

/// Records `speak`/`cancel` and keeps each utterance's sink.
///
/// Nothing is ever narrated; events only happen when the owner fires them
/// through [`RecordingEngine::sink_for`] or [`RecordingEngine::last_sink`].
#[derive(Default)]
pub struct RecordingEngine {
    inner: Mutex<Recorded>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `speak` fail synchronously with an engine error.
    pub fn fail_next_speak(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Only the speak calls, in order.
    pub fn spoken(&self) -> Vec<EngineCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, EngineCall::Speak { .. }))
            .cloned()
            .collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, EngineCall::Cancel))
            .count()
    }

    pub fn last_sink(&self) -> Option<EngineEventSink> {
        self.lock().sinks.last().cloned()
    }

    pub fn sink_for(&self, session: SessionHandle) -> Option<EngineEventSink> {
        self.lock()
            .sinks
            .iter()
            .find(|sink| sink.session() == session)
            .cloned()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.calls.clear();
        inner.sinks.clear();
    }
}

impl SpeechEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn speak(&self, utterance: Utterance, events: EngineEventSink) -> Result<()> {
        let mut inner = self.lock();
        if let Some(message) = inner.fail_next.take() {
            return Err(NarrationError::Engine(message));
        }
        inner.calls.push(EngineCall::Speak {
            session: utterance.session,
            text: utterance.text,
            rate: utterance.rate,
            lang: utterance.lang,
        });
        inner.sinks.push(events);
        Ok(())
    }

    fn cancel(&self) {
        self.lock().calls.push(EngineCall::Cancel);
    }
}
