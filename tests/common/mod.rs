//! Shared test helpers.

#![allow(dead_code)]

use std::sync::Arc;

use readaloud::engine::{EngineCall, EngineEventSink, RecordingEngine};
use readaloud::playback::PlaybackController;

pub const HELLO: &str = "Hello world";

/// A controller over a recording engine with `text` loaded and the
/// recording cleared.
pub fn recorded_controller(text: &str) -> (PlaybackController, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::new());
    let mut controller = PlaybackController::new(engine.clone());
    controller.load_text(text);
    engine.clear();
    (controller, engine)
}

/// A controller that is already narrating `text` from offset 0.
pub async fn playing_controller(text: &str) -> (PlaybackController, Arc<RecordingEngine>) {
    let (mut controller, engine) = recorded_controller(text);
    controller.play().expect("play should be accepted");
    controller.settle().await;
    assert!(controller.is_playing(), "controller should be playing");
    (controller, engine)
}

pub fn current_sink(engine: &RecordingEngine) -> EngineEventSink {
    engine.last_sink().expect("engine should have been asked to speak")
}

/// `(text, rate)` of the last speak call.
pub fn last_spoken(engine: &RecordingEngine) -> (String, f32) {
    match engine.spoken().last() {
        Some(EngineCall::Speak { text, rate, .. }) => (text.clone(), *rate),
        other => panic!("expected a speak call, got {other:?}"),
    }
}
