//! CLI entry point for readaloud.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::EngineKind;
use crate::error::{NarrationError, Result};
use crate::playback::NarratorCommand;
use crate::rate::RateLabel;

/// readaloud CLI
#[derive(Parser, Debug)]
#[command(name = "readaloud", version, about = "Narrate text with pause, resume and rate control")]
pub struct Cli {
    /// Config file (defaults to ~/.readaloud/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Narrate a text interactively
    Speak(SpeakArgs),
    /// List rate labels and the engine values they map to
    Rates,
}

/// Arguments for the `speak` subcommand.
#[derive(Parser, Debug)]
pub struct SpeakArgs {
    /// Read the text from a file
    #[arg(short, long, conflicts_with = "url")]
    pub file: Option<PathBuf>,

    /// Fetch the text with a single GET
    #[arg(short, long)]
    pub url: Option<String>,

    /// Initial rate label (1.0x, 1.25x, 1.5x, 1.75x, 2.0x)
    #[arg(short, long)]
    pub rate: Option<String>,

    /// Engine to drive (simulated, command)
    #[arg(short, long)]
    pub engine: Option<EngineKind>,

    /// Start narrating right away
    #[arg(long)]
    pub autoplay: bool,

    /// Print state changes as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAction {
    Command(NarratorCommand),
    Status,
    Help,
    Quit,
}

/// Parse one prompt line. Blank lines yield `None`.
pub fn parse_prompt(line: &str) -> Option<Result<PromptAction>> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let action = match verb {
        "play" | "p" => Ok(PromptAction::Command(NarratorCommand::Play)),
        "stop" | "s" => Ok(PromptAction::Command(NarratorCommand::Stop)),
        "toggle" | "t" => Ok(PromptAction::Command(NarratorCommand::Toggle)),
        "restart" | "r" => Ok(PromptAction::Command(NarratorCommand::Restart)),
        "rate" => match words.next() {
            Some(label) => RateLabel::parse_label(label)
                .map(|rate| PromptAction::Command(NarratorCommand::SetRate(rate))),
            None => Err(NarrationError::InvalidArgument(
                "usage: rate <1.0x|1.25x|1.5x|1.75x|2.0x>".into(),
            )),
        },
        "status" => Ok(PromptAction::Status),
        "help" | "?" => Ok(PromptAction::Help),
        "quit" | "q" | "exit" => Ok(PromptAction::Quit),
        other => Err(NarrationError::InvalidArgument(format!(
            "unknown command '{other}', try 'help'"
        ))),
    };
    Some(action)
}

pub const PROMPT_HELP: &str =
    "commands: play, stop, toggle, restart, rate <label>, status, help, quit";
