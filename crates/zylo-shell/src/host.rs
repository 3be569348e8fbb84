//! Host-side adapters for the headless shell.
//!
//! The embedded content is represented by a JSON snapshot file on disk; the
//! notification surface renders through the log. Both stand behind the same
//! seams a platform webview and notification center would.

use std::path::PathBuf;

use async_trait::async_trait;

use zylo_bridge::EmbeddedContent;
use zylo_notify::{LocalNotification, NotificationSurface};

/// Reads embedded-content storage from a JSON snapshot file.
///
/// The file holds a flat object keyed by storage key. String values are
/// returned verbatim; structured values are re-serialized, matching how the
/// content stores its config blob.
pub(crate) struct FileSnapshotContent {
    path: Option<PathBuf>,
}

impl FileSnapshotContent {
    pub(crate) fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl EmbeddedContent for FileSnapshotContent {
    async fn read_storage(&self, key: &str) -> Option<String> {
        let path = self.path.as_ref()?;
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        let snapshot: serde_json::Value = serde_json::from_str(&raw).ok()?;
        match snapshot.get(key)? {
            serde_json::Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Notification surface that renders through structured logs.
pub(crate) struct LogSurface;

impl NotificationSurface for LogSurface {
    fn present(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            priority = notification.priority.as_str(),
            category = notification.category.as_str(),
            sound = notification.alert.plays_sound(),
            vibration = ?notification.alert.vibration_pattern(),
            "notification"
        );
        Ok(())
    }

    fn set_badge(&self, count: u64) -> anyhow::Result<()> {
        tracing::info!(count, "badge");
        Ok(())
    }
}
