//! Event-to-surface dispatch.

use std::sync::Arc;

use zylo_channel::ChannelEvent;

use crate::presentation::{presentation, LocalNotification};

/// Host platform seam for displaying notifications and the app badge.
pub trait NotificationSurface: Send + Sync {
    fn present(&self, notification: &LocalNotification) -> anyhow::Result<()>;
    fn set_badge(&self, count: u64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// What a dispatch did, and whether the caller should query the server for a
/// fresh unread count. Counts are authoritative server-side and never derived
/// locally.
pub struct DispatchOutcome {
    pub presented: bool,
    pub refresh_badge: bool,
}

/// Routes channel events to the notification surface. Never fails outward;
/// surface errors are logged and dispatch continues.
pub struct NotificationDispatcher {
    surface: Arc<dyn NotificationSurface>,
}

impl NotificationDispatcher {
    pub fn new(surface: Arc<dyn NotificationSurface>) -> Self {
        Self { surface }
    }

    pub fn dispatch(&self, event: &ChannelEvent) -> DispatchOutcome {
        if let ChannelEvent::NotificationCount { count } = event {
            if let Err(error) = self.surface.set_badge(*count) {
                tracing::warn!(%error, count, "badge update failed");
            }
            return DispatchOutcome::default();
        }

        let Some(notification) = presentation(event) else {
            tracing::debug!(event = event.name(), "event has no presentation");
            return DispatchOutcome::default();
        };

        tracing::info!(
            event = event.name(),
            title = %notification.title,
            priority = notification.priority.as_str(),
            category = notification.category.as_str(),
            "presenting notification"
        );
        if let Err(error) = self.surface.present(&notification) {
            tracing::warn!(%error, event = event.name(), "notification present failed");
            return DispatchOutcome::default();
        }

        DispatchOutcome {
            presented: true,
            refresh_badge: true,
        }
    }
}
