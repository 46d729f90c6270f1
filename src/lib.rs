//! readaloud — read-aloud playback controller
//!
//! Drives a text-to-speech engine to narrate article and summary text:
//! pause and resume from the exact character offset, change the rate
//! without losing position, restart from the beginning, and switch
//! narration between list items with only one ever active.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use readaloud::prelude::*;
//!
//! # async fn example() -> readaloud::error::Result<()> {
//! let engine = Arc::new(SimulatedEngine::default());
//! let mut controller = PlaybackController::new(engine);
//! controller.load_text("Hello world");
//! controller.play()?;
//! controller.settle().await;
//! controller.set_rate(RateLabel::Fast);
//! while controller.is_active() || controller.snapshot().pending_rate_change {
//!     controller.step().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod prelude;
pub mod rate;
pub mod source;
pub mod switcher;

#[cfg(feature = "cli")]
pub mod cli;
