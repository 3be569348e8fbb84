//! Connection lifecycle for the event channel.
//!
//! One manager owns at most one live connection task. Reconnection after a
//! network fault is bounded with increasing delay; a server-commanded
//! disconnect reconnects immediately (rate limited so a misbehaving server
//! cannot drive a tight loop); an authentication rejection is fatal for the
//! current token and is never retried.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::events::{ChannelEvent, WireFrame};
use crate::transport::{ChannelError, ChannelSocket, ChannelTransport, ConnectError};

/// Reconnect attempt cap after which the channel gives up.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;
/// Backoff floor between reconnect attempts.
pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 1_000;
/// Backoff ceiling between reconnect attempts.
pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 5_000;
/// Minimum gap between two server-commanded immediate reconnects.
pub const DEFAULT_SERVER_DISCONNECT_MIN_GAP_MS: u64 = 10_000;

const FATAL_CONNECTIVITY_MESSAGE: &str =
    "Sunucuya bağlanılamıyor. Lütfen internet bağlantınızı kontrol edin ve uygulamayı yeniden başlatın.";
const AUTH_REJECTED_MESSAGE: &str = "Oturum bilgileri geçersiz. Lütfen tekrar giriş yapın.";
const MISSING_TOKEN_MESSAGE: &str = "Oturum anahtarı bulunamadı. Lütfen tekrar giriş yapın.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates connection states of the event channel.
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Snapshot of the channel state plus the running reconnect counter.
pub struct ChannelStatus {
    pub state: ConnectionState,
    pub reconnect_attempt: u32,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// User-facing channel conditions surfaced to the session layer.
pub enum ChannelNotice {
    /// Transient connection problem; the banner offers a reconnect.
    ConnectionProblem { message: String },
    /// Reconnect cap exhausted; emitted exactly once per initialize.
    FatalConnectivity { message: String },
    /// The server rejected the current token; a fresh token is required.
    AuthRejected { message: String },
}

#[derive(Debug, Clone)]
/// Configuration for [`EventChannelManager`].
pub struct EventChannelConfig {
    pub server_url: String,
    pub reconnect_max_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub server_disconnect_min_gap: Duration,
}

impl Default for EventChannelConfig {
    fn default() -> Self {
        Self {
            server_url: "wss://zylo.vet".to_string(),
            reconnect_max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
            reconnect_base_delay: Duration::from_millis(DEFAULT_RECONNECT_BASE_DELAY_MS),
            reconnect_max_delay: Duration::from_millis(DEFAULT_RECONNECT_MAX_DELAY_MS),
            server_disconnect_min_gap: Duration::from_millis(DEFAULT_SERVER_DISCONNECT_MIN_GAP_MS),
        }
    }
}

/// Receiver halves handed to the session layer at construction.
pub struct ChannelStreams {
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
    pub notices: mpsc::UnboundedReceiver<ChannelNotice>,
}

/// Delay before reconnect attempt `attempt` (1-based): doubling from the
/// floor, clamped to the ceiling.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(6);
    let scaled = base
        .as_millis()
        .saturating_mul(1_u128 << exponent)
        .min(max.as_millis());
    Duration::from_millis(scaled.try_into().unwrap_or(u64::MAX))
}

struct LiveConnection {
    task: JoinHandle<()>,
    cancel_tx: watch::Sender<bool>,
    outbound_tx: mpsc::UnboundedSender<WireFrame>,
}

/// Exclusive owner of the event channel connection.
pub struct EventChannelManager {
    config: EventChannelConfig,
    transport: Arc<dyn ChannelTransport>,
    status_tx: watch::Sender<ChannelStatus>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    notice_tx: mpsc::UnboundedSender<ChannelNotice>,
    live: Mutex<Option<LiveConnection>>,
}

impl EventChannelManager {
    pub fn new(
        config: EventChannelConfig,
        transport: Arc<dyn ChannelTransport>,
    ) -> (Self, ChannelStreams) {
        let (status_tx, _) = watch::channel(ChannelStatus::default());
        let (event_tx, events) = mpsc::unbounded_channel();
        let (notice_tx, notices) = mpsc::unbounded_channel();
        (
            Self {
                config,
                transport,
                status_tx,
                event_tx,
                notice_tx,
                live: Mutex::new(None),
            },
            ChannelStreams { events, notices },
        )
    }

    /// Starts a fresh connection with `token`, tearing down any prior one.
    ///
    /// An absent token fails fast: no connection attempt is made and the
    /// channel lands in `Error` until a token arrives.
    pub async fn initialize(&self, token: &str) {
        self.teardown_live().await;

        if token.trim().is_empty() {
            self.set_status(ConnectionState::Error, 0);
            let _ = self.notice_tx.send(ChannelNotice::ConnectionProblem {
                message: MISSING_TOKEN_MESSAGE.to_string(),
            });
            return;
        }

        self.set_status(ConnectionState::Connecting, 0);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection_loop(ConnectionLoop {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            token: token.to_string(),
            status_tx: self.status_tx.clone(),
            event_tx: self.event_tx.clone(),
            notice_tx: self.notice_tx.clone(),
            cancel_rx,
            outbound_rx,
        }));

        let mut live = self.live.lock().expect("live connection lock");
        *live = Some(LiveConnection {
            task,
            cancel_tx,
            outbound_tx,
        });
    }

    /// Tears down any live connection and clears retry counters. Idempotent;
    /// returns once sockets and timers are released.
    pub async fn disconnect(&self) {
        self.teardown_live().await;
        self.set_status(ConnectionState::Disconnected, 0);
    }

    /// Current state; never blocks.
    pub fn status(&self) -> ConnectionState {
        self.status_tx.borrow().state
    }

    /// Reconnect attempts since the last successful connect.
    pub fn reconnect_attempt(&self) -> u32 {
        self.status_tx.borrow().reconnect_attempt
    }

    /// Watch handle over status transitions, for observers that prefer
    /// push over the 1s poll.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    /// Queues a `notification:get_count` query; dropped when not connected.
    pub fn request_unread_count(&self) {
        if self.status() != ConnectionState::Connected {
            return;
        }
        let live = self.live.lock().expect("live connection lock");
        if let Some(connection) = live.as_ref() {
            let _ = connection.outbound_tx.send(WireFrame::get_count());
        }
    }

    async fn teardown_live(&self) {
        let taken = {
            let mut live = self.live.lock().expect("live connection lock");
            live.take()
        };
        if let Some(connection) = taken {
            let _ = connection.cancel_tx.send(true);
            connection.task.abort();
            let _ = connection.task.await;
        }
    }

    fn set_status(&self, state: ConnectionState, reconnect_attempt: u32) {
        self.status_tx.send_replace(ChannelStatus {
            state,
            reconnect_attempt,
        });
    }
}

struct ConnectionLoop {
    config: EventChannelConfig,
    transport: Arc<dyn ChannelTransport>,
    token: String,
    status_tx: watch::Sender<ChannelStatus>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    notice_tx: mpsc::UnboundedSender<ChannelNotice>,
    cancel_rx: watch::Receiver<bool>,
    outbound_rx: mpsc::UnboundedReceiver<WireFrame>,
}

enum SessionEnd {
    Cancelled,
    AuthRejected { message: String },
    ServerDisconnect,
    TransportDropped,
}

async fn run_connection_loop(mut ctx: ConnectionLoop) {
    let mut attempt: u32 = 0;
    let mut last_immediate: Option<tokio::time::Instant> = None;

    loop {
        set_status(&ctx.status_tx, ConnectionState::Connecting, attempt);

        let connect = tokio::select! {
            _ = cancelled(&mut ctx.cancel_rx) => {
                set_status(&ctx.status_tx, ConnectionState::Disconnected, 0);
                return;
            }
            result = ctx.transport.connect(&ctx.config.server_url, &ctx.token) => result,
        };

        match connect {
            Ok(mut socket) => {
                // The channel is not usable until client_ready is on the wire.
                match socket.send_frame(&WireFrame::client_ready()).await {
                    Ok(()) => {
                        attempt = 0;
                        set_status(&ctx.status_tx, ConnectionState::Connected, 0);
                        tracing::info!("event channel connected");

                        let end = run_session(
                            socket.as_mut(),
                            &mut ctx.cancel_rx,
                            &mut ctx.outbound_rx,
                            &ctx.event_tx,
                        )
                        .await;
                        socket.close().await;

                        match end {
                            SessionEnd::Cancelled => {
                                set_status(&ctx.status_tx, ConnectionState::Disconnected, 0);
                                return;
                            }
                            SessionEnd::AuthRejected { message } => {
                                fail_auth(&ctx, &message);
                                return;
                            }
                            SessionEnd::ServerDisconnect => {
                                let now = tokio::time::Instant::now();
                                let allow = last_immediate.map_or(true, |previous| {
                                    now.duration_since(previous)
                                        >= ctx.config.server_disconnect_min_gap
                                });
                                if allow {
                                    last_immediate = Some(now);
                                    tracing::info!("server requested session rotation; reconnecting");
                                    continue;
                                }
                                tracing::warn!(
                                    "server disconnect repeated within rate-limit gap; using backoff"
                                );
                            }
                            SessionEnd::TransportDropped => {
                                tracing::warn!("event channel connection dropped");
                            }
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "client_ready handshake failed");
                        socket.close().await;
                    }
                }
            }
            Err(ConnectError::AuthRejected(detail)) => {
                fail_auth(&ctx, &detail);
                return;
            }
            Err(ConnectError::MissingToken) => {
                set_status(&ctx.status_tx, ConnectionState::Error, attempt);
                return;
            }
            Err(ConnectError::Transport(detail)) => {
                tracing::warn!(%detail, "event channel connect failed");
                let _ = ctx.notice_tx.send(ChannelNotice::ConnectionProblem {
                    message: format!("Bağlantı hatası: {detail}"),
                });
            }
        }

        attempt = attempt.saturating_add(1);
        if attempt >= ctx.config.reconnect_max_attempts {
            set_status(&ctx.status_tx, ConnectionState::Error, attempt);
            let _ = ctx.notice_tx.send(ChannelNotice::FatalConnectivity {
                message: FATAL_CONNECTIVITY_MESSAGE.to_string(),
            });
            tracing::error!(attempt, "reconnect cap exhausted");
            return;
        }

        set_status(&ctx.status_tx, ConnectionState::Connecting, attempt);
        let delay = backoff_delay(
            ctx.config.reconnect_base_delay,
            ctx.config.reconnect_max_delay,
            attempt,
        );
        tokio::select! {
            _ = cancelled(&mut ctx.cancel_rx) => {
                set_status(&ctx.status_tx, ConnectionState::Disconnected, 0);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

enum SessionStep {
    Cancelled,
    Outbound(Option<WireFrame>),
    Inbound(Option<Result<WireFrame, ChannelError>>),
}

async fn run_session(
    socket: &mut dyn ChannelSocket,
    cancel_rx: &mut watch::Receiver<bool>,
    outbound_rx: &mut mpsc::UnboundedReceiver<WireFrame>,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
) -> SessionEnd {
    loop {
        let step = tokio::select! {
            _ = cancelled(cancel_rx) => SessionStep::Cancelled,
            outbound = outbound_rx.recv() => SessionStep::Outbound(outbound),
            inbound = socket.next_frame() => SessionStep::Inbound(inbound),
        };

        match step {
            SessionStep::Cancelled | SessionStep::Outbound(None) => return SessionEnd::Cancelled,
            SessionStep::Outbound(Some(frame)) => {
                if let Err(error) = socket.send_frame(&frame).await {
                    tracing::warn!(%error, event = %frame.event, "outbound frame send failed");
                    return SessionEnd::TransportDropped;
                }
            }
            SessionStep::Inbound(None) => return SessionEnd::TransportDropped,
            SessionStep::Inbound(Some(Err(ChannelError::MalformedFrame(raw)))) => {
                tracing::debug!(frame = %raw, "skipping malformed frame");
            }
            SessionStep::Inbound(Some(Err(error))) => {
                tracing::warn!(%error, "event channel read failed");
                return SessionEnd::TransportDropped;
            }
            SessionStep::Inbound(Some(Ok(frame))) => match ChannelEvent::from(frame) {
                ChannelEvent::AuthError { message } => {
                    return SessionEnd::AuthRejected { message }
                }
                ChannelEvent::ServerDisconnect => return SessionEnd::ServerDisconnect,
                event => {
                    // Arrival order is preserved; the receiver sees events in
                    // exactly the order the transport produced them.
                    let _ = event_tx.send(event);
                }
            },
        }
    }
}

fn fail_auth(ctx: &ConnectionLoop, detail: &str) {
    tracing::error!(detail, "event channel authentication rejected");
    let _ = ctx.notice_tx.send(ChannelNotice::AuthRejected {
        message: AUTH_REJECTED_MESSAGE.to_string(),
    });
    set_status(&ctx.status_tx, ConnectionState::Error, 0);
}

fn set_status(status_tx: &watch::Sender<ChannelStatus>, state: ConnectionState, attempt: u32) {
    status_tx.send_replace(ChannelStatus {
        state,
        reconnect_attempt: attempt,
    });
}

async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // Manager dropped without cancelling; the task is about to be
            // aborted, so just park.
            std::future::pending::<()>().await;
        }
    }
}
