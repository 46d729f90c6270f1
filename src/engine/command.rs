//! Engine backed by an external TTS program (`espeak-ng`, `spd-say`, `say`).

use std::process::Stdio;
use std::sync::Mutex;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::{EngineEventSink, SpeechEngine, Utterance};
use crate::error::{NarrationError, Result};

/// Words per minute a command engine treats as engine rate 1.0.
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Runs one child process per utterance.
///
/// Arguments may contain `{rate}`, `{wpm}`, `{lang}` and `{text}`
/// placeholders. Without a `{text}` argument the text is written to the
/// child's stdin. The program gives no progress, so no boundary events are
/// reported and a resume starts from the last known offset.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            kill_switch: Mutex::new(None),
        }
    }

    /// `espeak-ng -v <lang> -s <wpm> --stdin`.
    pub fn espeak() -> Self {
        Self::new(
            "espeak-ng",
            vec![
                "-v".into(),
                "{lang}".into(),
                "-s".into(),
                "{wpm}".into(),
                "--stdin".into(),
            ],
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn takes_text_argument(&self) -> bool {
        self.args.iter().any(|arg| arg.contains("{text}"))
    }

    /// Arguments with placeholders filled in for `utterance`.
    pub fn render_args(&self, utterance: &Utterance) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{rate}", &utterance.rate.to_string())
                    .replace("{wpm}", &wpm.to_string())
                    .replace("{lang}", &utterance.lang)
                    .replace("{text}", &utterance.text)
            })
            .collect()
    }

    fn swap_kill_switch(&self, next: Option<oneshot::Sender<()>>) {
        let mut slot = self.kill_switch.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.take() {
            let _ = previous.send(());
        }
        *slot = next;
    }
}

impl SpeechEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn speak(&self, utterance: Utterance, events: EngineEventSink) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            NarrationError::Engine("command engine needs a tokio runtime".into())
        })?;
        let pipe_text = !self.takes_text_argument();

        let mut command = Command::new(&self.program);
        command
            .args(self.render_args(&utterance))
            .stdin(if pipe_text { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = {
            // `spawn` registers the child with the runtime's reactor.
            let _guard = runtime.enter();
            command.spawn().map_err(|error| {
                NarrationError::Engine(format!("failed to start {}: {error}", self.program))
            })?
        };

        let (kill_tx, kill_rx) = oneshot::channel();
        self.swap_kill_switch(Some(kill_tx));
        let stdin_text = pipe_text.then_some(utterance.text);
        runtime.spawn(supervise(child, stdin_text, kill_rx, events));
        Ok(())
    }

    fn cancel(&self) {
        self.swap_kill_switch(None);
    }
}

async fn supervise(
    mut child: tokio::process::Child,
    stdin_text: Option<String>,
    kill_rx: oneshot::Receiver<()>,
    events: EngineEventSink,
) {
    let outcome = {
        let run = async {
            if let (Some(text), Some(mut stdin)) = (stdin_text, child.stdin.take()) {
                if let Err(error) = stdin.write_all(text.as_bytes()).await {
                    tracing::warn!(%error, "failed to pipe text to TTS command");
                }
                drop(stdin);
            }
            child.wait().await
        };
        // A kill interrupts the stdin write as well as the wait.
        tokio::select! {
            status = run => Some(status),
            _ = kill_rx => None,
        }
    };

    match outcome {
        Some(Ok(status)) if status.success() => events.end(),
        Some(Ok(status)) => events.error(format!("TTS command exited with {status}")),
        Some(Err(error)) => events.error(format!("TTS command failed: {error}")),
        None => {
            if let Err(error) = child.kill().await {
                tracing::debug!(%error, "TTS command already gone");
            }
        }
    }
}
