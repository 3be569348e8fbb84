//! Headless runtime for the Zylo mobile shell session layer.
//!
//! Wires the token bridge, event channel, notification dispatcher and session
//! coordinator into one select loop. Embedded-content messages arrive as JSON
//! lines on stdin; `active` / `background` lines drive app-phase transitions.

mod bootstrap_helpers;
mod host;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use zylo_api::{ApiClient, ApiClientConfig, DeviceInfo};
use zylo_bridge::{
    parse_shell_message, theme_change_listener_script, theme_probe_script,
    token_extraction_script, ShellMessage, TokenBridge, TokenBridgeConfig,
    DEFAULT_CONFIG_STORAGE_KEY,
};
use zylo_channel::{
    EventChannelConfig, EventChannelManager, TungsteniteTransport, DEFAULT_RECONNECT_BASE_DELAY_MS,
};
use zylo_core::TokenVault;
use zylo_notify::{NotificationDispatcher, NotificationSurface};
use zylo_session::{AppPhase, Banner, SessionConfig, SessionCoordinator};

use crate::bootstrap_helpers::init_tracing;
use crate::host::{FileSnapshotContent, LogSurface};

#[derive(Debug, Parser)]
#[command(name = "zylo-shell", version, about = "Zylo mobile shell session runtime")]
struct ShellArgs {
    /// Event channel server URL.
    #[arg(long, env = "ZYLO_SERVER_URL", default_value = "wss://zylo.vet")]
    server_url: String,

    /// REST API base URL.
    #[arg(long, env = "ZYLO_API_BASE", default_value = "https://zylo.vet/api")]
    api_base: String,

    /// Directory holding persistent shell state (the token vault).
    #[arg(long, env = "ZYLO_STATE_DIR", default_value = ".zylo-shell")]
    state_dir: PathBuf,

    /// Storage key the embedded content keeps the auth token under.
    #[arg(long, default_value = "token")]
    storage_key: String,

    /// Token bridge storage poll interval in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    storage_poll_ms: u64,

    /// JSON snapshot file standing in for the embedded content's storage.
    #[arg(long)]
    content_snapshot: Option<PathBuf>,

    /// Push token to register with the server once connected.
    #[arg(long, env = "ZYLO_PUSH_TOKEN")]
    push_token: Option<String>,
}

fn device_info() -> DeviceInfo {
    DeviceInfo {
        model: "headless-shell".to_string(),
        os: std::env::consts::OS.to_string(),
        os_version: std::env::consts::ARCH.to_string(),
        device_name: "zylo-shell".to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = ShellArgs::parse();
    run(args).await
}

async fn run(args: ShellArgs) -> Result<()> {
    std::fs::create_dir_all(&args.state_dir).with_context(|| {
        format!("failed to create state dir {}", args.state_dir.display())
    })?;
    let vault = TokenVault::load(args.state_dir.join("vault.json"), &args.storage_key)?;

    let (manager, mut streams) = EventChannelManager::new(
        EventChannelConfig {
            server_url: args.server_url.clone(),
            ..EventChannelConfig::default()
        },
        Arc::new(TungsteniteTransport),
    );
    let manager = Arc::new(manager);

    let api = ApiClient::new(ApiClientConfig {
        api_base: args.api_base.clone(),
        ..ApiClientConfig::default()
    })?;
    let dispatcher = NotificationDispatcher::new(Arc::new(LogSurface) as Arc<dyn NotificationSurface>);

    let session_config = SessionConfig::new(args.push_token.clone(), device_info());
    let status_poll_interval = session_config.status_poll_interval;
    let mut coordinator = SessionCoordinator::new(
        session_config,
        vault,
        Arc::clone(&manager),
        dispatcher,
        api,
    );

    let content = Arc::new(FileSnapshotContent::new(args.content_snapshot.clone()));
    let (bridge, mut tokens) = TokenBridge::spawn(
        TokenBridgeConfig {
            storage_key: args.storage_key.clone(),
            poll_interval: Duration::from_millis(args.storage_poll_ms.max(1)),
        },
        content,
    );

    // A real host evaluates these inside its webview; here they only matter
    // as the contract the snapshot file and stdin feed stand in for.
    let extraction_script = token_extraction_script(&args.storage_key, args.storage_poll_ms);
    let theme_listener = theme_change_listener_script(DEFAULT_CONFIG_STORAGE_KEY, args.storage_poll_ms);
    tracing::debug!(
        extraction_bytes = extraction_script.len(),
        theme_listener_bytes = theme_listener.len(),
        "content instrumentation prepared"
    );

    coordinator.start().await;

    let mut status_tick = tokio::time::interval(status_poll_interval);
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_banner: Option<Banner> = None;

    tracing::info!(
        server_url = %args.server_url,
        reconnect_base_delay_ms = DEFAULT_RECONNECT_BASE_DELAY_MS,
        "shell started"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            token = tokens.recv() => {
                match token {
                    Some(token) => coordinator.handle_token(token).await,
                    None => {
                        tracing::warn!("token bridge stream closed");
                        break;
                    }
                }
            }
            event = streams.events.recv() => {
                match event {
                    Some(event) => coordinator.handle_event(event).await,
                    None => {
                        tracing::warn!("event channel stream closed");
                        break;
                    }
                }
            }
            notice = streams.notices.recv() => {
                if let Some(notice) = notice {
                    coordinator.handle_notice(notice);
                }
            }
            line = stdin_lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => handle_input_line(&mut coordinator, &bridge, &line).await,
                    None => {
                        tracing::debug!("stdin closed; continuing headless");
                        stdin_open = false;
                    }
                }
            }
            _ = status_tick.tick() => {
                coordinator.poll_status().await;
                if coordinator.take_theme_probe_request() {
                    let probe = theme_probe_script(DEFAULT_CONFIG_STORAGE_KEY);
                    tracing::debug!(bytes = probe.len(), "content theme probe requested");
                }
                let banner = coordinator.banner().cloned();
                if banner != last_banner {
                    if let Some(banner) = &banner {
                        tracing::warn!(kind = ?banner.kind, message = %banner.message, "banner");
                    } else {
                        tracing::info!("banner cleared");
                    }
                    last_banner = banner;
                }
            }
        }
    }

    coordinator.shutdown().await;
    bridge.shutdown();
    tracing::info!("shell stopped");
    Ok(())
}

async fn handle_input_line(
    coordinator: &mut SessionCoordinator,
    bridge: &TokenBridge,
    line: &str,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    // Bare phase words drive app lifecycle; everything else is a content
    // message in the postMessage JSON format.
    match line {
        "active" => {
            coordinator.handle_phase(AppPhase::Active).await;
            return;
        }
        "background" => {
            coordinator.handle_phase(AppPhase::Background).await;
            return;
        }
        _ => {}
    }

    let Some(message) = parse_shell_message(line) else {
        tracing::debug!("ignoring malformed content message");
        return;
    };

    match message {
        ShellMessage::Token { value } => bridge.offer(&value),
        ShellMessage::Theme { .. } => match message.theme_mode() {
            Some(mode) => tracing::info!(theme = mode.as_str(), "content theme changed"),
            None => tracing::debug!("content theme message without usable mode"),
        },
        ShellMessage::ConsoleLog { data } | ShellMessage::ConsoleInfo { data } => {
            tracing::info!(%data, "content console");
        }
        ShellMessage::ConsoleWarn { data } => {
            tracing::warn!(%data, "content console");
        }
        ShellMessage::ConsoleError { data } => {
            tracing::error!(%data, "content console");
        }
        ShellMessage::LoginError { .. } => {
            let text = message.error_text().unwrap_or_default();
            tracing::warn!(error = %text, "content login error");
        }
        ShellMessage::GlobalError { .. } => {
            let text = message.error_text().unwrap_or_default();
            tracing::error!(error = %text, "content global error");
            coordinator.handle_content_error(text);
        }
    }
}
