//! The session coordinator.

use std::sync::Arc;
use std::time::Duration;

use zylo_api::{ApiClient, ApiError, DeviceInfo};
use zylo_channel::{ChannelEvent, ChannelNotice, ConnectionState, EventChannelManager};
use zylo_core::TokenVault;
use zylo_notify::NotificationDispatcher;

/// How often the coordinator samples the channel status.
pub const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates host application lifecycle phases.
pub enum AppPhase {
    Active,
    Background,
}

impl AppPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Background => "background",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which recovery the banner offers.
pub enum BannerKind {
    /// Channel trouble; the banner offers a reconnect.
    Channel,
    /// Embedded content trouble; the banner offers a reload.
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The single error banner shown over the embedded content.
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Debug, Clone)]
/// Configuration for [`SessionCoordinator`].
pub struct SessionConfig {
    pub push_token: Option<String>,
    pub device: DeviceInfo,
    pub status_poll_interval: Duration,
}

impl SessionConfig {
    pub fn new(push_token: Option<String>, device: DeviceInfo) -> Self {
        Self {
            push_token,
            device,
            status_poll_interval: Duration::from_millis(DEFAULT_STATUS_POLL_INTERVAL_MS),
        }
    }
}

/// Wires the token vault, event channel, REST client and dispatcher together.
///
/// Single-threaded by design: the shell's select loop calls into it; nothing
/// here spawns tasks of its own.
pub struct SessionCoordinator {
    config: SessionConfig,
    vault: TokenVault,
    manager: Arc<EventChannelManager>,
    dispatcher: NotificationDispatcher,
    api: ApiClient,
    session_token: Option<String>,
    registered_pair: Option<(String, String)>,
    banner: Option<Banner>,
    observed_state: ConnectionState,
    phase: AppPhase,
    theme_probe_requested: bool,
}

impl SessionCoordinator {
    pub fn new(
        config: SessionConfig,
        vault: TokenVault,
        manager: Arc<EventChannelManager>,
        dispatcher: NotificationDispatcher,
        api: ApiClient,
    ) -> Self {
        let session_token = vault.token().map(ToOwned::to_owned);
        Self {
            config,
            vault,
            manager,
            dispatcher,
            api,
            session_token,
            registered_pair: None,
            banner: None,
            observed_state: ConnectionState::Disconnected,
            phase: AppPhase::Active,
            theme_probe_requested: true,
        }
    }

    /// Connects with the persisted token, when one survived the last run.
    pub async fn start(&mut self) {
        if let Some(token) = self.session_token.clone() {
            tracing::info!("starting session with persisted token");
            self.manager.initialize(&token).await;
        } else {
            tracing::info!("no persisted token; waiting for the token bridge");
        }
    }

    /// Handles a token emitted by the token bridge.
    ///
    /// A changed token is persisted, pushed into the channel manager (tearing
    /// down any live session on the old token) and re-arms device
    /// registration.
    pub async fn handle_token(&mut self, token: String) {
        if self.session_token.as_deref() == Some(token.as_str()) {
            return;
        }

        if let Err(error) = self.vault.store(&token) {
            tracing::warn!(%error, "failed to persist session token");
        }
        self.session_token = Some(token.clone());
        self.registered_pair = None;
        tracing::info!("session token changed; reinitializing channel");
        self.manager.initialize(&token).await;
    }

    /// Dispatches an inbound channel event, refreshing the badge afterwards
    /// when the dispatch asks for it.
    pub async fn handle_event(&mut self, event: ChannelEvent) {
        let outcome = self.dispatcher.dispatch(&event);
        if outcome.refresh_badge {
            self.refresh_unread_count().await;
        }
    }

    /// Handles a channel notice.
    pub fn handle_notice(&mut self, notice: ChannelNotice) {
        match notice {
            ChannelNotice::ConnectionProblem { message }
            | ChannelNotice::FatalConnectivity { message } => {
                self.set_banner(BannerKind::Channel, message);
            }
            ChannelNotice::AuthRejected { message } => {
                tracing::warn!("server rejected session token; clearing vault");
                if let Err(error) = self.vault.clear() {
                    tracing::warn!(%error, "failed to clear token vault");
                }
                self.session_token = None;
                self.registered_pair = None;
                self.set_banner(BannerKind::Channel, message);
            }
        }
    }

    /// One status-poll tick. Detects the transition into `Connected`, which
    /// clears the channel banner and runs the first-connect work.
    pub async fn poll_status(&mut self) {
        let state = self.manager.status();
        if state == ConnectionState::Connected && self.observed_state != ConnectionState::Connected
        {
            self.clear_banner(BannerKind::Channel);
            self.on_connected().await;
        }
        self.observed_state = state;
    }

    /// Handles a host app-phase transition.
    pub async fn handle_phase(&mut self, phase: AppPhase) {
        let previous = self.phase;
        self.phase = phase;
        match phase {
            AppPhase::Active => {
                if previous == AppPhase::Background {
                    // Resume always re-probes the content theme; the host
                    // consumes the flag.
                    self.theme_probe_requested = true;
                    if self.manager.status() != ConnectionState::Connected {
                        if let Some(token) = self.session_token.clone() {
                            tracing::info!("resumed while disconnected; reinitializing channel");
                            self.manager.initialize(&token).await;
                        }
                    }
                }
            }
            AppPhase::Background => {
                if let Some(token) = self.session_token.clone() {
                    if let Err(error) = self.api.send_ping(&token, phase.as_str()).await {
                        tracing::warn!(%error, "background liveness ping failed");
                    }
                }
            }
        }
    }

    /// Records a failure inside the embedded content itself.
    pub fn handle_content_error(&mut self, message: String) {
        self.set_banner(BannerKind::Content, message);
    }

    /// Current banner, if any. Single slot, most recent wins.
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Consumes the pending theme-probe request, returning whether one was
    /// set since the last call.
    pub fn take_theme_probe_request(&mut self) -> bool {
        std::mem::take(&mut self.theme_probe_requested)
    }

    /// Last channel state seen by the status poll.
    pub fn observed_state(&self) -> ConnectionState {
        self.observed_state
    }

    /// Tears the session down. The channel manager returns only once its
    /// connection task is gone.
    pub async fn shutdown(&mut self) {
        self.manager.disconnect().await;
        self.observed_state = ConnectionState::Disconnected;
    }

    async fn on_connected(&mut self) {
        self.maybe_register_device().await;
        self.refresh_unread_count().await;
    }

    /// One-time registration per `(auth_token, push_token)` pair. A failure
    /// is logged and left armed; the next qualifying transition retries.
    async fn maybe_register_device(&mut self) {
        let (Some(token), Some(push_token)) =
            (self.session_token.clone(), self.config.push_token.clone())
        else {
            return;
        };
        let pair = (token.clone(), push_token.clone());
        if self.registered_pair.as_ref() == Some(&pair) {
            return;
        }

        match self
            .api
            .register_device(&token, &push_token, &self.config.device)
            .await
        {
            Ok(()) => {
                tracing::info!("device push token registered");
                self.registered_pair = Some(pair);
            }
            Err(ApiError::AuthRejected) => self.drop_rejected_token(),
            Err(error) => {
                tracing::warn!(%error, "device registration failed");
            }
        }
    }

    async fn refresh_unread_count(&mut self) {
        let Some(token) = self.session_token.clone() else {
            return;
        };
        match self.api.unread_count(&token).await {
            Ok(count) => {
                self.dispatcher
                    .dispatch(&ChannelEvent::NotificationCount { count });
            }
            Err(ApiError::AuthRejected) => self.drop_rejected_token(),
            Err(error) => {
                tracing::warn!(%error, "unread count refresh failed");
            }
        }
    }

    fn drop_rejected_token(&mut self) {
        tracing::warn!("api rejected session token; clearing vault");
        if let Err(error) = self.vault.clear() {
            tracing::warn!(%error, "failed to clear token vault");
        }
        self.session_token = None;
        self.registered_pair = None;
    }

    fn set_banner(&mut self, kind: BannerKind, message: String) {
        self.banner = Some(Banner { kind, message });
    }

    fn clear_banner(&mut self, kind: BannerKind) {
        if self.banner.as_ref().map(|banner| banner.kind) == Some(kind) {
            self.banner = None;
        }
    }
}

#[cfg(test)]
mod tests;
