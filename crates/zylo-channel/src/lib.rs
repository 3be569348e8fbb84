//! Real-time event channel between the Zylo mobile shell and the server.
//!
//! Owns the single persistent websocket connection, its reconnect/backoff
//! state machine, the wire frame catalog, and the routing of inbound events
//! toward the notification dispatcher. No other component touches the
//! connection directly; everything goes through [`EventChannelManager`].

mod events;
mod manager;
mod transport;

pub use events::{parse_channel_frame, ChannelEvent, WireFrame};
pub use manager::{
    backoff_delay, ChannelNotice, ChannelStatus, ChannelStreams, ConnectionState,
    EventChannelConfig, EventChannelManager, DEFAULT_RECONNECT_BASE_DELAY_MS,
    DEFAULT_RECONNECT_MAX_ATTEMPTS, DEFAULT_RECONNECT_MAX_DELAY_MS,
    DEFAULT_SERVER_DISCONNECT_MIN_GAP_MS,
};
pub use transport::{
    channel_url, ChannelError, ChannelSocket, ChannelTransport, ConnectError, TungsteniteTransport,
};
