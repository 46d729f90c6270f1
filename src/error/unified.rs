//! Error classification and recovery hints.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The speech engine failed mid-utterance or refused to start.
    Engine,
    /// Narration text could not be obtained.
    TextSource,
    Network,
    Configuration,
    /// Caller passed a label, offset or value outside the accepted set.
    Usage,
    Io,
    Unknown,
}

/// Suggested recovery action, surfaced to whoever drives the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Press play again; nothing is retried automatically.
    PressPlayAgain,
    /// Controls stay disabled until text is available.
    KeepControlsDisabled,
    CheckConfiguration,
    FixCaller,
    None,
}
