//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::engine::{CommandEngine, SimulatedEngine, SpeechEngine};
use crate::error::{NarrationError, Result};
use crate::rate::RateLabel;

/// Global default config (lazy-initialized from env).
static DEFAULT_CONFIG: OnceLock<NarrationConfig> = OnceLock::new();

/// Pause between a `cancel` and the next `speak`.
///
/// Engines tear sessions down asynchronously; speaking again before the
/// teardown finishes gets the new utterance dropped or garbled.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

pub const DEFAULT_LANGUAGE: &str = "ja-JP";

/// Which engine a front-end should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Simulated,
    Command,
}

/// Settings for one narration front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub settle_delay_ms: u64,
    /// BCP 47 tag put on every utterance.
    pub language: String,
    /// Rate label used until the listener picks another.
    pub rate: RateLabel,
    /// Where the narration text is fetched from.
    pub text_url: Option<String>,
    pub engine: EngineKind,
    pub engine_command: Option<String>,
    pub engine_args: Vec<String>,
    /// Simulated engine pacing, per char at engine rate 1.0.
    pub char_duration_ms: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            language: DEFAULT_LANGUAGE.to_string(),
            rate: RateLabel::default(),
            text_url: None,
            engine: EngineKind::default(),
            engine_command: None,
            engine_args: Vec::new(),
            char_duration_ms: crate::engine::simulated::DEFAULT_CHAR_DURATION.as_millis() as u64,
        }
    }
}

impl NarrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `READALOUD_*` environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static NarrationConfig {
        DEFAULT_CONFIG.get_or_init(Self::from_env)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input)
            .map_err(|error| NarrationError::Configuration(format!("invalid config: {error}")))
    }

    /// Read a TOML config file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let contents = std::fs::read_to_string(path).map_err(|error| {
            NarrationError::Configuration(format!("cannot read {}: {error}", path.display()))
        })?;
        Ok(Self::from_toml_str(&contents)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// `~/.readaloud/config.toml`.
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".readaloud"))
            .unwrap_or_else(|| PathBuf::from(".readaloud"))
            .join("config.toml")
    }

    /// Apply overrides from `lookup`. Unparseable values are logged and
    /// ignored so a typo in the environment never stops narration.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("READALOUD_SETTLE_MS") {
            match value.trim().parse() {
                Ok(ms) => self.settle_delay_ms = ms,
                Err(_) => tracing::warn!(%value, "ignoring READALOUD_SETTLE_MS"),
            }
        }
        if let Some(value) = lookup("READALOUD_LANG") {
            self.language = value;
        }
        if let Some(value) = lookup("READALOUD_RATE") {
            match RateLabel::parse_label(&value) {
                Ok(rate) => self.rate = rate,
                Err(_) => tracing::warn!(%value, "ignoring READALOUD_RATE"),
            }
        }
        if let Some(value) = lookup("READALOUD_TEXT_URL") {
            self.text_url = Some(value);
        }
        if let Some(value) = lookup("READALOUD_ENGINE") {
            match value.trim().to_lowercase().parse() {
                Ok(engine) => self.engine = engine,
                Err(_) => tracing::warn!(%value, "ignoring READALOUD_ENGINE"),
            }
        }
        if let Some(value) = lookup("READALOUD_ENGINE_CMD") {
            self.engine_command = Some(value);
        }
        if let Some(value) = lookup("READALOUD_ENGINE_ARGS") {
            self.engine_args = value.split_whitespace().map(str::to_string).collect();
        }
        if let Some(value) = lookup("READALOUD_CHAR_MS") {
            match value.trim().parse() {
                Ok(ms) => self.char_duration_ms = ms,
                Err(_) => tracing::warn!(%value, "ignoring READALOUD_CHAR_MS"),
            }
        }
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn char_duration(&self) -> Duration {
        Duration::from_millis(self.char_duration_ms)
    }

    /// Build the engine this config names.
    pub fn build_engine(&self) -> Result<Arc<dyn SpeechEngine>> {
        match self.engine {
            EngineKind::Simulated => Ok(Arc::new(SimulatedEngine::new(self.char_duration()))),
            EngineKind::Command => match &self.engine_command {
                Some(program) if self.engine_args.is_empty() && program == "espeak-ng" => {
                    Ok(Arc::new(CommandEngine::espeak()))
                }
                Some(program) => Ok(Arc::new(CommandEngine::new(
                    program.clone(),
                    self.engine_args.clone(),
                ))),
                None => Err(NarrationError::Configuration(
                    "engine = command needs engine_command (READALOUD_ENGINE_CMD)".into(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_constants() {
        let config = NarrationConfig::default();
        assert_eq!(config.settle_delay(), DEFAULT_SETTLE_DELAY);
        assert_eq!(config.settle_delay(), Duration::from_millis(200));
        assert_eq!(config.language, "ja-JP");
        assert_eq!(config.rate, RateLabel::Normal);
        assert_eq!(config.engine, EngineKind::Simulated);
    }

    #[test]
    fn env_overrides_replace_defaults() {
        let config = NarrationConfig::default().with_env_overrides(lookup(&[
            ("READALOUD_SETTLE_MS", "350"),
            ("READALOUD_LANG", "en-GB"),
            ("READALOUD_RATE", "1.75x"),
            ("READALOUD_ENGINE", "Command"),
            ("READALOUD_ENGINE_CMD", "say"),
            ("READALOUD_ENGINE_ARGS", "-r {rate} {text}"),
        ]));
        assert_eq!(config.settle_delay_ms, 350);
        assert_eq!(config.language, "en-GB");
        assert_eq!(config.rate, RateLabel::Faster);
        assert_eq!(config.engine, EngineKind::Command);
        assert_eq!(config.engine_command.as_deref(), Some("say"));
        assert_eq!(config.engine_args, vec!["-r", "{rate}", "{text}"]);
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let config = NarrationConfig::default().with_env_overrides(lookup(&[
            ("READALOUD_SETTLE_MS", "soon"),
            ("READALOUD_RATE", "9x"),
            ("READALOUD_ENGINE", "browser"),
        ]));
        assert_eq!(config, NarrationConfig::default());
    }

    #[test]
    fn command_engine_requires_a_program() {
        let config = NarrationConfig {
            engine: EngineKind::Command,
            ..Default::default()
        };
        assert!(matches!(
            config.build_engine(),
            Err(NarrationError::Configuration(_))
        ));

        let config = NarrationConfig {
            engine: EngineKind::Command,
            engine_command: Some("espeak-ng".into()),
            ..Default::default()
        };
        assert_eq!(config.build_engine().unwrap().name(), "espeak-ng");
    }

    #[test]
    fn default_path_ends_in_config_toml() {
        assert!(NarrationConfig::default_path().ends_with(".readaloud/config.toml"));
    }
}
