//! Token bridge surfacing the auth token held by the embedded content.
//!
//! The content sandbox offers no storage-change primitive the shell can
//! subscribe to, so the bridge pairs interval polling with a push path fed by
//! storage-event messages. Extraction failures are swallowed; the next poll
//! retries naturally.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::scripts::{DEFAULT_STORAGE_POLL_MS, DEFAULT_TOKEN_STORAGE_KEY};

#[async_trait]
/// Read access into the embedded content's local storage.
pub trait EmbeddedContent: Send + Sync {
    /// Returns the stored value for `key`, or `None` when unavailable.
    async fn read_storage(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
/// Configuration for the token bridge polling loop.
pub struct TokenBridgeConfig {
    pub storage_key: String,
    pub poll_interval: Duration,
}

impl Default for TokenBridgeConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_TOKEN_STORAGE_KEY.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_STORAGE_POLL_MS),
        }
    }
}

/// Handle over the polling task producing the token stream.
///
/// The stream is lazy and unbounded; dropping the bridge (or calling
/// [`TokenBridge::shutdown`]) stops it, and a fresh `spawn` restarts it.
pub struct TokenBridge {
    offer_tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl TokenBridge {
    /// Spawns the polling loop and returns the bridge plus its token stream.
    ///
    /// A value is emitted whenever the stored token changes, including the
    /// first time one becomes available after content load.
    pub fn spawn(
        config: TokenBridgeConfig,
        content: Arc<dyn EmbeddedContent>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (token_tx, token_rx) = mpsc::unbounded_channel();
        let (offer_tx, offer_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_poll_loop(config, content, offer_rx, token_tx));
        (Self { offer_tx, task }, token_rx)
    }

    /// Pushes a storage-event token value into the stream out of band.
    pub fn offer(&self, token: &str) {
        let _ = self.offer_tx.send(token.to_string());
    }

    /// Stops the polling loop.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TokenBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_poll_loop(
    config: TokenBridgeConfig,
    content: Arc<dyn EmbeddedContent>,
    mut offer_rx: mpsc::UnboundedReceiver<String>,
    token_tx: mpsc::UnboundedSender<String>,
) {
    let mut interval = tokio::time::interval(config.poll_interval.max(Duration::from_millis(1)));
    let mut last_emitted: Option<String> = None;

    loop {
        let candidate = tokio::select! {
            _ = interval.tick() => content.read_storage(&config.storage_key).await,
            offered = offer_rx.recv() => match offered {
                Some(value) => Some(value),
                None => return,
            },
        };

        let Some(token) = candidate else {
            continue;
        };
        if token.trim().is_empty() {
            continue;
        }
        if last_emitted.as_deref() == Some(token.as_str()) {
            continue;
        }

        tracing::debug!(storage_key = %config.storage_key, "token bridge observed new token");
        last_emitted = Some(token.clone());
        if token_tx.send(token).is_err() {
            return;
        }
    }
}
