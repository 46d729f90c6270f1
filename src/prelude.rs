//! Convenience re-exports for common use.

pub use crate::config::{EngineKind, NarrationConfig, DEFAULT_SETTLE_DELAY};
pub use crate::engine::{
    CommandEngine, EngineEvent, EngineEventKind, RecordingEngine, SessionHandle,
    SimulatedEngine, SpeechEngine, SpeechEngineAdapter,
};
pub use crate::error::{NarrationError, Result};
pub use crate::playback::{
    Narrator, NarratorHandle, PlaybackController, PlaybackPhase, PlaybackSnapshot, Signal,
};
pub use crate::rate::RateLabel;
pub use crate::source::{FileTextSource, HttpTextSource, TextSource};
pub use crate::switcher::{NarrationTarget, TargetId, TargetStatus, TargetSwitcher, ToggleOutcome};
