//! Error types for readaloud.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all narration operations.
#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("Narration text unavailable: {0}")]
    TextUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NarrationError {
    /// Text is missing because it was never loaded.
    pub fn no_text() -> Self {
        Self::TextUnavailable("no narration text loaded".into())
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(_) => ErrorCategory::Engine,
            Self::TextUnavailable(_) => ErrorCategory::TextSource,
            Self::Network(_) => ErrorCategory::Network,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidArgument(_) | Self::InvalidState(_) => ErrorCategory::Usage,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Suggest recovery actions. None of them involve an automatic retry.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Engine => RecoverySuggestion::PressPlayAgain,
            ErrorCategory::TextSource | ErrorCategory::Network => {
                RecoverySuggestion::KeepControlsDisabled
            }
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Usage => RecoverySuggestion::FixCaller,
            ErrorCategory::Io | ErrorCategory::Unknown => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, NarrationError>;
