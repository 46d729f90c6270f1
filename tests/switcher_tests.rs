//! Exclusive narration across list items.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use readaloud::engine::{EngineCall, RecordingEngine};
use readaloud::rate::RateLabel;
use readaloud::switcher::{NarrationTarget, TargetId, TargetStatus, TargetSwitcher, ToggleOutcome};

const TEXT_A: &str = "First article summary";
const TEXT_B: &str = "Second article summary";

fn switcher() -> (TargetSwitcher, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::new());
    (TargetSwitcher::new(engine.clone()), engine)
}

fn id(value: &str) -> TargetId {
    TargetId::from(value)
}

#[tokio::test(start_paused = true)]
async fn toggling_same_target_twice_stops_it() {
    // Second press on the playing item is a stop, not a restart.
    let (mut switcher, engine) = switcher();

    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Started);
    switcher.settle().await;
    assert_eq!(switcher.status(&id("item-1")), TargetStatus::Playing);

    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Stopped);
    assert_eq!(switcher.active(), None);
    assert_eq!(switcher.status(&id("item-1")), TargetStatus::Idle);
    assert_eq!(engine.calls().last(), Some(&EngineCall::Cancel));
}

#[tokio::test(start_paused = true)]
async fn switching_cancels_previous_target_before_speaking() {
    // Cancel lands before the new speak, with the settling delay between.
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    let first_session = switcher.snapshot().session.unwrap();
    common::current_sink(&engine).boundary(6);
    switcher.drain();
    engine.clear();

    let outcome = switcher.toggle("item-2", TEXT_B).unwrap();
    assert_eq!(outcome, ToggleOutcome::Switched { from: id("item-1") });
    assert_eq!(engine.calls().first(), Some(&EngineCall::Cancel));
    assert!(engine.spoken().is_empty(), "speak must wait for the settle delay");

    switcher.settle().await;

    let calls = engine.calls();
    let cancel_at = calls.iter().position(|c| *c == EngineCall::Cancel).unwrap();
    let speak_at = calls
        .iter()
        .position(|c| matches!(c, EngineCall::Speak { .. }))
        .unwrap();
    assert!(cancel_at < speak_at);
    assert_eq!(common::last_spoken(&engine).0, TEXT_B);
    assert_eq!(switcher.active(), Some(&id("item-2")));
    assert_eq!(switcher.snapshot().offset, 0);
    assert_ne!(switcher.snapshot().session, Some(first_session));
}

#[tokio::test(start_paused = true)]
async fn at_most_one_target_plays_at_any_instant() {
    let (mut switcher, engine) = switcher();
    let items = ["item-1", "item-2", "item-3"];
    let sequence = ["item-1", "item-2", "item-2", "item-3", "item-1", "item-1", "item-3"];

    for target in sequence {
        switcher.toggle(target, format!("text of {target}")).unwrap();
        assert!(switcher.playing().len() <= 1);
        switcher.settle().await;
        let playing = items
            .iter()
            .filter(|item| switcher.status(&id(item)) == TargetStatus::Playing)
            .count();
        assert!(playing <= 1, "after toggling {target}: {playing} playing");
        if let Some(sink) = engine.last_sink() {
            sink.boundary(3);
        }
        switcher.drain();
    }
}

#[tokio::test(start_paused = true)]
async fn stale_end_from_previous_target_does_not_release_new_one() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    let stale = common::current_sink(&engine);

    switcher.toggle("item-2", TEXT_B).unwrap();
    switcher.settle().await;
    stale.end();
    switcher.drain();

    assert_eq!(switcher.active(), Some(&id("item-2")));
    assert_eq!(switcher.status(&id("item-2")), TargetStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn finished_target_restarts_from_beginning() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    common::current_sink(&engine).end();
    switcher.drain();
    assert_eq!(switcher.active(), None);

    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Started);
    switcher.settle().await;
    assert_eq!(common::last_spoken(&engine).0, TEXT_A);
}

#[tokio::test(start_paused = true)]
async fn stopped_target_toggles_back_from_zero() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    common::current_sink(&engine).boundary(6);
    switcher.drain();
    switcher.toggle("item-1", TEXT_A).unwrap();

    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;

    assert_eq!(common::last_spoken(&engine).0, TEXT_A);
    assert_eq!(switcher.snapshot().offset, 0);
}

#[tokio::test(start_paused = true)]
async fn status_reports_starting_during_settle_window() {
    let (mut switcher, _engine) = switcher();
    switcher.register(NarrationTarget::new("item-1", TEXT_A));

    switcher.toggle_registered(&id("item-1")).unwrap();
    assert_eq!(switcher.status(&id("item-1")), TargetStatus::Starting);
    assert!(switcher.playing().is_empty());

    switcher.settle().await;
    assert_eq!(switcher.playing(), vec![&id("item-1")]);
}

#[tokio::test(start_paused = true)]
async fn rate_change_keeps_active_target_and_position() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    common::current_sink(&engine).boundary(6);
    switcher.drain();

    switcher.set_rate(RateLabel::Fastest);
    switcher.settle().await;

    assert_eq!(switcher.active(), Some(&id("item-1")));
    assert_eq!(
        common::last_spoken(&engine),
        ("article summary".to_string(), 2.5)
    );
}

#[tokio::test(start_paused = true)]
async fn stop_and_close_release_the_channel() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;

    switcher.stop();
    assert_eq!(switcher.active(), None);

    switcher.toggle("item-2", TEXT_B).unwrap();
    switcher.close();
    switcher.settle().await;
    assert_eq!(switcher.active(), None);
    assert_eq!(engine.spoken().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_change_after_stop_does_not_resume_unowned_audio() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    common::current_sink(&engine).boundary(6);
    switcher.drain();
    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Stopped);

    switcher.set_rate(RateLabel::Fastest);
    switcher.settle().await;

    assert_eq!(engine.spoken().len(), 1);
    assert!(!switcher.controller().is_playing());
    assert_eq!(switcher.active(), None);
    assert_eq!(switcher.snapshot().rate, RateLabel::Fastest);

    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Started);
    switcher.settle().await;
    assert_eq!(
        common::last_spoken(&engine),
        (TEXT_A.to_string(), 2.5)
    );
}

#[tokio::test(start_paused = true)]
async fn toggle_during_rate_change_stops_the_active_target() {
    let (mut switcher, engine) = switcher();
    switcher.toggle("item-1", TEXT_A).unwrap();
    switcher.settle().await;
    common::current_sink(&engine).boundary(6);
    switcher.drain();

    switcher.set_rate(RateLabel::Fastest);
    assert_eq!(switcher.status(&id("item-1")), TargetStatus::Starting);

    assert_eq!(switcher.toggle("item-1", TEXT_A).unwrap(), ToggleOutcome::Stopped);
    switcher.settle().await;

    assert_eq!(switcher.active(), None);
    assert_eq!(engine.spoken().len(), 1);
    assert_eq!(switcher.snapshot().offset, 6);
}
