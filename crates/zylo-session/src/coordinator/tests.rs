use std::future::pending;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use zylo_api::{ApiClient, ApiClientConfig, DeviceInfo};
use zylo_channel::{
    ChannelEvent, ChannelNotice, ChannelSocket, ChannelTransport, ConnectError, ConnectionState,
    EventChannelConfig, EventChannelManager, WireFrame,
};
use zylo_core::token_vault::DEFAULT_AUTH_TOKEN_KEY;
use zylo_core::TokenVault;
use zylo_notify::{LocalNotification, NotificationDispatcher, NotificationSurface};

use super::{AppPhase, BannerKind, SessionConfig, SessionCoordinator};

struct HoldTransport {
    connects: AtomicUsize,
}

#[async_trait]
impl ChannelTransport for HoldTransport {
    async fn connect(
        &self,
        _server_url: &str,
        _token: &str,
    ) -> Result<Box<dyn ChannelSocket>, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HoldSocket))
    }
}

struct HoldSocket;

#[async_trait]
impl ChannelSocket for HoldSocket {
    async fn send_frame(&mut self, _frame: &WireFrame) -> Result<(), zylo_channel::ChannelError> {
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<WireFrame, zylo_channel::ChannelError>> {
        pending().await
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct RecordingSurface {
    presented: Mutex<Vec<LocalNotification>>,
    badge: Mutex<Option<u64>>,
}

impl NotificationSurface for RecordingSurface {
    fn present(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        self.presented
            .lock()
            .expect("presented lock")
            .push(notification.clone());
        Ok(())
    }

    fn set_badge(&self, count: u64) -> anyhow::Result<()> {
        *self.badge.lock().expect("badge lock") = Some(count);
        Ok(())
    }
}

struct Harness {
    coordinator: SessionCoordinator,
    transport: Arc<HoldTransport>,
    surface: Arc<RecordingSurface>,
    vault_path: PathBuf,
    _tempdir: TempDir,
}

fn test_device() -> DeviceInfo {
    DeviceInfo {
        model: "Pixel 8".to_string(),
        os: "android".to_string(),
        os_version: "14".to_string(),
        device_name: "Test Device".to_string(),
        app_version: "1.0.0".to_string(),
    }
}

fn harness(server: &MockServer, push_token: Option<&str>, stored_token: Option<&str>) -> Harness {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let vault_path = tempdir.path().join("vault.json");
    let mut vault = TokenVault::load(vault_path.clone(), DEFAULT_AUTH_TOKEN_KEY).expect("vault");
    if let Some(token) = stored_token {
        vault.store(token).expect("seed token");
    }

    let transport = Arc::new(HoldTransport {
        connects: AtomicUsize::new(0),
    });
    let (manager, _streams) = EventChannelManager::new(
        EventChannelConfig::default(),
        Arc::clone(&transport) as Arc<dyn ChannelTransport>,
    );

    let surface = Arc::new(RecordingSurface::default());
    let dispatcher =
        NotificationDispatcher::new(Arc::clone(&surface) as Arc<dyn NotificationSurface>);

    let api = ApiClient::new(ApiClientConfig {
        api_base: server.base_url(),
        request_timeout_ms: 2_000,
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
    })
    .expect("api client");

    let coordinator = SessionCoordinator::new(
        SessionConfig::new(push_token.map(ToOwned::to_owned), test_device()),
        vault,
        Arc::new(manager),
        dispatcher,
        api,
    );

    Harness {
        coordinator,
        transport,
        surface,
        vault_path,
        _tempdir: tempdir,
    }
}

fn stored_vault_token(path: &PathBuf) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
    value["token"].as_str().map(ToOwned::to_owned)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn spec_token_emission_persists_and_initializes_channel() {
    let server = MockServer::start();
    let mut harness = harness(&server, None, None);

    harness.coordinator.handle_token("tok123".to_string()).await;
    settle().await;

    assert_eq!(
        stored_vault_token(&harness.vault_path).as_deref(),
        Some("tok123")
    );
    assert_eq!(harness.transport.connects.load(Ordering::SeqCst), 1);

    // Unchanged token does not reinitialize.
    harness.coordinator.handle_token("tok123".to_string()).await;
    settle().await;
    assert_eq!(harness.transport.connects.load(Ordering::SeqCst), 1);

    harness.coordinator.shutdown().await;
}

#[tokio::test]
async fn spec_first_connect_registers_device_once_and_refreshes_badge() {
    let server = MockServer::start();
    let register = server.mock(|when, then| {
        when.method(POST)
            .path("/notifications/register-device")
            .header("authorization", "Bearer tok123")
            .json_body_includes(json!({ "push_token": "push-abc" }).to_string());
        then.status(200).json_body(json!({ "success": true }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/notifications/unread-count");
        then.status(200)
            .json_body(json!({ "success": true, "count": 4 }));
    });

    let mut harness = harness(&server, Some("push-abc"), Some("tok123"));
    harness.coordinator.start().await;
    settle().await;

    harness.coordinator.poll_status().await;
    assert_eq!(
        harness.coordinator.observed_state(),
        ConnectionState::Connected
    );
    assert_eq!(register.calls(), 1);
    assert_eq!(*harness.surface.badge.lock().expect("badge lock"), Some(4));

    // A second tick in the same connected stretch registers nothing new.
    harness.coordinator.poll_status().await;
    assert_eq!(register.calls(), 1);

    harness.coordinator.shutdown().await;
}

#[tokio::test]
async fn spec_failed_registration_is_rearmed_for_the_next_connect() {
    let server = MockServer::start();
    let register = server.mock(|when, then| {
        when.method(POST).path("/notifications/register-device");
        then.status(500).body("boom");
    });
    server.mock(|when, then| {
        when.method(GET).path("/notifications/unread-count");
        then.status(200)
            .json_body(json!({ "success": true, "count": 0 }));
    });

    let mut harness = harness(&server, Some("push-abc"), Some("tok123"));
    harness.coordinator.start().await;
    settle().await;
    harness.coordinator.poll_status().await;
    assert_eq!(register.calls(), 1);

    // Next connected transition retries; a standing registration would not.
    harness.coordinator.shutdown().await;
    harness.coordinator.poll_status().await;
    harness.coordinator.start().await;
    settle().await;
    harness.coordinator.poll_status().await;
    assert_eq!(register.calls(), 2);

    harness.coordinator.shutdown().await;
}

#[tokio::test]
async fn spec_auth_rejection_notice_clears_vault_and_token() {
    let server = MockServer::start();
    let ping = server.mock(|when, then| {
        when.method(POST).path("/mobile/ping");
        then.status(200).json_body(json!({ "success": true }));
    });

    let mut harness = harness(&server, None, Some("tok123"));
    harness.coordinator.handle_notice(ChannelNotice::AuthRejected {
        message: "Oturum bilgileri geçersiz. Lütfen tekrar giriş yapın.".to_string(),
    });

    assert_eq!(stored_vault_token(&harness.vault_path), None);
    let banner = harness.coordinator.banner().expect("banner set");
    assert_eq!(banner.kind, BannerKind::Channel);

    // Without a session token there is nothing to ping.
    harness.coordinator.handle_phase(AppPhase::Background).await;
    assert_eq!(ping.calls(), 0);
}

#[tokio::test]
async fn spec_connected_transition_clears_channel_banner_but_not_content() {
    let server = MockServer::start();
    let mut harness = harness(&server, None, Some("tok123"));

    harness
        .coordinator
        .handle_notice(ChannelNotice::ConnectionProblem {
            message: "Bağlantı hatası: refused".to_string(),
        });
    assert_eq!(
        harness.coordinator.banner().map(|banner| banner.kind),
        Some(BannerKind::Channel)
    );

    harness.coordinator.start().await;
    settle().await;
    harness.coordinator.poll_status().await;
    assert!(harness.coordinator.banner().is_none());

    harness
        .coordinator
        .handle_content_error("content failed to load".to_string());
    harness.coordinator.shutdown().await;
    harness.coordinator.poll_status().await;
    harness.coordinator.start().await;
    settle().await;
    harness.coordinator.poll_status().await;
    assert_eq!(
        harness.coordinator.banner().map(|banner| banner.kind),
        Some(BannerKind::Content)
    );

    harness.coordinator.shutdown().await;
}

#[tokio::test]
async fn spec_banner_slot_is_most_recent_wins() {
    let server = MockServer::start();
    let mut harness = harness(&server, None, None);

    harness
        .coordinator
        .handle_notice(ChannelNotice::ConnectionProblem {
            message: "first".to_string(),
        });
    harness
        .coordinator
        .handle_content_error("second".to_string());
    assert_eq!(
        harness.coordinator.banner().map(|banner| banner.kind),
        Some(BannerKind::Content)
    );

    harness
        .coordinator
        .handle_notice(ChannelNotice::FatalConnectivity {
            message: "third".to_string(),
        });
    let banner = harness.coordinator.banner().expect("banner");
    assert_eq!(banner.kind, BannerKind::Channel);
    assert_eq!(banner.message, "third");
}

#[tokio::test]
async fn spec_resume_reinitializes_and_requests_theme_probe() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/mobile/ping");
        then.status(200).json_body(json!({ "success": true }));
    });

    let mut harness = harness(&server, None, Some("tok123"));
    assert!(harness.coordinator.take_theme_probe_request());
    assert!(!harness.coordinator.take_theme_probe_request());

    harness.coordinator.handle_phase(AppPhase::Background).await;
    harness.coordinator.handle_phase(AppPhase::Active).await;
    settle().await;

    assert_eq!(harness.transport.connects.load(Ordering::SeqCst), 1);
    assert!(harness.coordinator.take_theme_probe_request());

    harness.coordinator.shutdown().await;
}

#[tokio::test]
async fn spec_background_transition_sends_liveness_ping() {
    let server = MockServer::start();
    let ping = server.mock(|when, then| {
        when.method(POST)
            .path("/mobile/ping")
            .header("authorization", "Bearer tok123")
            .json_body_includes(json!({ "app_state": "background" }).to_string());
        then.status(200).json_body(json!({ "success": true }));
    });

    let mut harness = harness(&server, None, Some("tok123"));
    harness.coordinator.handle_phase(AppPhase::Background).await;
    assert_eq!(ping.calls(), 1);
}

#[tokio::test]
async fn spec_presented_event_triggers_server_count_refresh() {
    let server = MockServer::start();
    let count = server.mock(|when, then| {
        when.method(GET)
            .path("/notifications/unread-count")
            .header("authorization", "Bearer tok123");
        then.status(200)
            .json_body(json!({ "success": true, "count": 9 }));
    });

    let mut harness = harness(&server, None, Some("tok123"));
    harness
        .coordinator
        .handle_event(ChannelEvent::NotificationNew {
            title: "Yeni Bildirim".to_string(),
            content: "Bir mesajınız var".to_string(),
        })
        .await;

    assert_eq!(count.calls(), 1);
    assert_eq!(harness.surface.presented.lock().expect("lock").len(), 1);
    assert_eq!(*harness.surface.badge.lock().expect("badge lock"), Some(9));

    // Lifecycle events neither present nor hit the server.
    harness.coordinator.handle_event(ChannelEvent::Pong).await;
    assert_eq!(count.calls(), 1);
}
