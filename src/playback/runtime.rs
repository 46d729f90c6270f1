//! Controller running on its own task, driven through a cloneable handle.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{PlaybackController, PlaybackSnapshot};
use crate::error::{NarrationError, Result};
use crate::rate::RateLabel;

/// A user action forwarded to the controller task.
#[derive(Debug, Clone, PartialEq)]
pub enum NarratorCommand {
    Play,
    Stop,
    Toggle,
    Restart,
    SetRate(RateLabel),
    LoadText(String),
}

type Request = (NarratorCommand, oneshot::Sender<Result<()>>);

/// Sends commands to a running [`Narrator`]. Replies come back as soon as
/// the controller has accepted the command, long before any audio.
#[derive(Clone)]
pub struct NarratorHandle {
    commands: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl NarratorHandle {
    pub async fn send(&self, command: NarratorCommand) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send((command, reply_tx))
            .map_err(|_| NarrationError::InvalidState("narrator has shut down".into()))?;
        reply_rx
            .await
            .map_err(|_| NarrationError::InvalidState("narrator dropped the request".into()))?
    }

    pub async fn play(&self) -> Result<()> {
        self.send(NarratorCommand::Play).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(NarratorCommand::Stop).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(NarratorCommand::Toggle).await
    }

    pub async fn restart(&self) -> Result<()> {
        self.send(NarratorCommand::Restart).await
    }

    pub async fn set_rate(&self, rate: RateLabel) -> Result<()> {
        self.send(NarratorCommand::SetRate(rate)).await
    }

    pub async fn load_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(NarratorCommand::LoadText(text.into())).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every state change.
    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }
}

struct NarratorRuntime {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns a controller on a spawned task.
pub struct Narrator {
    handle: NarratorHandle,
    runtime: Option<NarratorRuntime>,
}

impl Narrator {
    /// Move `controller` onto a new task.
    pub fn spawn(controller: PlaybackController) -> Self {
        let snapshots = controller.subscribe();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_controller_loop(controller, commands_rx, shutdown_rx));
        Self {
            handle: NarratorHandle {
                commands: commands_tx,
                snapshots,
            },
            runtime: Some(NarratorRuntime { shutdown_tx, task }),
        }
    }

    pub fn handle(&self) -> NarratorHandle {
        self.handle.clone()
    }

    /// Stop the task and cancel any audio. Outstanding handles start
    /// failing with `InvalidState`.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.await.map_err(|error| {
                NarrationError::InvalidState(format!("narrator task failed: {error}"))
            })?;
        }
        Ok(())
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.abort();
        }
    }
}

async fn run_controller_loop(
    mut controller: PlaybackController,
    mut commands: mpsc::UnboundedReceiver<Request>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            request = commands.recv() => match request {
                Some((command, reply)) => {
                    let _ = reply.send(apply(&mut controller, command));
                }
                None => break,
            },
            signal = controller.next_signal() => match signal {
                Some(signal) => controller.dispatch(signal),
                None => break,
            },
        }
    }
    controller.close();
    tracing::debug!("narrator stopped");
}

fn apply(controller: &mut PlaybackController, command: NarratorCommand) -> Result<()> {
    match command {
        NarratorCommand::Play => controller.play(),
        NarratorCommand::Stop => {
            controller.stop();
            Ok(())
        }
        NarratorCommand::Toggle => controller.toggle(),
        NarratorCommand::Restart => controller.restart(),
        NarratorCommand::SetRate(rate) => {
            controller.set_rate(rate);
            Ok(())
        }
        NarratorCommand::LoadText(text) => {
            controller.load_text(text);
            Ok(())
        }
    }
}
