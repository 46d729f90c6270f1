//! Where narration text comes from.
//!
//! Text is fetched once when a view mounts and is opaque to the controller.
//! A failed fetch is not retried; the controls simply stay disabled.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{NarrationError, Result};
use crate::playback::PlaybackController;

/// A one-shot provider of narration text.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetch the full narration text.
    async fn fetch(&self) -> Result<String>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Single `GET` of a text resource.
#[derive(Debug, Clone)]
pub struct HttpTextSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTextSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TextSource for HttpTextSource {
    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NarrationError::TextUnavailable(format!(
                "GET {} returned {status}",
                self.url
            )));
        }
        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Text read from a local file.
#[derive(Debug, Clone)]
pub struct FileTextSource {
    path: PathBuf,
}

impl FileTextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            NarrationError::TextUnavailable(format!("{}: {error}", self.path.display()))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetch once and hand the text to `controller`. On failure the controller
/// is left without text and the error is returned for the caller to show
/// or ignore.
pub async fn load_into(source: &dyn TextSource, controller: &mut PlaybackController) -> Result<()> {
    match source.fetch().await {
        Ok(text) => {
            if text.is_empty() {
                tracing::warn!(source = %source.describe(), "narration text is empty");
            }
            controller.load_text(text);
            Ok(())
        }
        Err(error) => {
            tracing::warn!(source = %source.describe(), %error, "failed to load narration text");
            Err(error)
        }
    }
}
