//! Timer-driven engine that paces narration without producing audio.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use super::{EngineEventSink, SpeechEngine, Utterance};
use crate::error::{NarrationError, Result};

/// Time one char takes at engine rate 1.0.
pub const DEFAULT_CHAR_DURATION: Duration = Duration::from_millis(60);

/// Reports a boundary at every word start, then `end`.
///
/// Pacing is `char_duration / rate` per char, so the same text finishes
/// sooner at a higher rate.
pub struct SimulatedEngine {
    char_duration: Duration,
    active: Mutex<Option<JoinHandle<()>>>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHAR_DURATION)
    }
}

impl SimulatedEngine {
    pub fn new(char_duration: Duration) -> Self {
        Self {
            char_duration,
            active: Mutex::new(None),
        }
    }

    fn replace_active(&self, task: Option<JoinHandle<()>>) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = active.take() {
            previous.abort();
        }
        *active = task;
    }
}

impl SpeechEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    fn speak(&self, utterance: Utterance, events: EngineEventSink) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            NarrationError::Engine("simulated engine needs a tokio runtime".into())
        })?;
        let per_char = self.char_duration.div_f32(utterance.rate);
        let task = runtime.spawn(narrate(utterance.text, per_char, events));
        self.replace_active(Some(task));
        Ok(())
    }

    fn cancel(&self) {
        self.replace_active(None);
    }
}

async fn narrate(text: String, per_char: Duration, events: EngineEventSink) {
    let total = text.chars().count();
    let mut position = 0usize;
    for start in word_starts(&text) {
        let gap = (start - position) as u32;
        time::sleep(per_char * gap).await;
        position = start;
        events.boundary(start);
    }
    time::sleep(per_char * (total - position) as u32).await;
    events.end();
}

/// Char indices where a word begins.
pub fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous_was_space = true;
    for (index, ch) in text.chars().enumerate() {
        let is_space = ch.is_whitespace();
        if previous_was_space && !is_space {
            starts.push(index);
        }
        previous_was_space = is_space;
    }
    starts
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{EngineEventKind, SpeechEngineAdapter};

    #[test]
    fn word_starts_skip_runs_of_whitespace() {
        assert_eq!(word_starts("Hello world"), vec![0, 6]);
        assert_eq!(word_starts("  a  bc d"), vec![2, 5, 8]);
        assert!(word_starts("").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn narrates_boundaries_then_end() {
        let engine = Arc::new(SimulatedEngine::new(Duration::from_millis(10)));
        let (mut adapter, mut events) = SpeechEngineAdapter::new(engine, "en-US");
        adapter.speak("Hello world", 1.0, 0).unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = events.recv().await {
            let done = event.kind == EngineEventKind::End;
            kinds.push(event.kind);
            if done {
                break;
            }
        }
        assert_eq!(
            kinds,
            vec![
                EngineEventKind::Boundary { char_index: 0 },
                EngineEventKind::Boundary { char_index: 6 },
                EngineEventKind::End,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_further_events() {
        let engine = Arc::new(SimulatedEngine::new(Duration::from_millis(10)));
        let (mut adapter, mut events) = SpeechEngineAdapter::new(engine, "en-US");
        adapter.speak("one two three", 1.0, 0).unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.kind, EngineEventKind::Boundary { char_index: 0 });
        adapter.cancel();

        time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn speak_outside_runtime_is_an_engine_error() {
        let engine = Arc::new(SimulatedEngine::default());
        let (mut adapter, _events) = SpeechEngineAdapter::new(engine, "en-US");
        let err = adapter.speak("text", 1.5, 0).unwrap_err();
        assert!(matches!(err, NarrationError::Engine(_)));
    }
}
