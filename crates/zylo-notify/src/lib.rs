//! Local notification dispatch for the Zylo mobile shell.
//!
//! Maps inbound channel events onto locally displayed notifications through a
//! fixed presentation table, and drives the numeric badge from the server's
//! authoritative unread count. Presentation is pure; side effects go through
//! the [`NotificationSurface`] seam so the host platform stays pluggable.

mod dispatcher;
mod presentation;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher, NotificationSurface};
pub use presentation::{presentation, AlertClass, Category, LocalNotification, Priority};
