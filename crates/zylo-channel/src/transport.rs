//! Transport seam for the event channel.
//!
//! The manager speaks to the server through [`ChannelTransport`] so the
//! connection loop can be exercised against scripted sockets in tests. The
//! production implementation rides tokio-tungstenite with the auth token in
//! the connect URL's query string.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::events::{parse_channel_frame, WireFrame};

#[derive(Debug, Error)]
/// Enumerates failures establishing a channel connection.
pub enum ConnectError {
    #[error("missing auth token")]
    MissingToken,
    #[error("authentication rejected: {0}")]
    AuthRejected(String),
    #[error("connect failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
/// Enumerates failures on an established channel connection.
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

#[async_trait]
/// A live bidirectional socket carrying wire frames.
pub trait ChannelSocket: Send {
    async fn send_frame(&mut self, frame: &WireFrame) -> Result<(), ChannelError>;
    async fn next_frame(&mut self) -> Option<Result<WireFrame, ChannelError>>;
    async fn close(&mut self);
}

#[async_trait]
/// Factory establishing authenticated channel connections.
pub trait ChannelTransport: Send + Sync {
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<Box<dyn ChannelSocket>, ConnectError>;
}

/// Builds the websocket connect URL, carrying the token as a query parameter.
pub fn channel_url(server_url: &str, token: &str) -> String {
    let base = server_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}token={token}")
}

/// Production transport over tokio-tungstenite.
#[derive(Debug, Default, Clone)]
pub struct TungsteniteTransport;

#[async_trait]
impl ChannelTransport for TungsteniteTransport {
    async fn connect(
        &self,
        server_url: &str,
        token: &str,
    ) -> Result<Box<dyn ChannelSocket>, ConnectError> {
        let url = channel_url(server_url, token);
        let (stream, _response) = connect_async(&url).await.map_err(classify_connect_error)?;
        Ok(Box::new(TungsteniteSocket { stream }))
    }
}

fn classify_connect_error(error: WsError) -> ConnectError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                ConnectError::AuthRejected(format!("server rejected credentials ({status})"))
            } else {
                ConnectError::Transport(format!("handshake failed with status {status}"))
            }
        }
        other => ConnectError::Transport(other.to_string()),
    }
}

struct TungsteniteSocket {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl ChannelSocket for TungsteniteSocket {
    async fn send_frame(&mut self, frame: &WireFrame) -> Result<(), ChannelError> {
        self.stream
            .send(WsMessage::text(frame.encode()))
            .await
            .map_err(|error| ChannelError::Transport(error.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<WireFrame, ChannelError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(error) => return Some(Err(ChannelError::Transport(error.to_string()))),
            };
            match message {
                WsMessage::Text(raw) => match parse_channel_frame(raw.as_str()) {
                    Some(frame) => return Some(Ok(frame)),
                    None => {
                        return Some(Err(ChannelError::MalformedFrame(
                            raw.as_str().chars().take(120).collect(),
                        )))
                    }
                },
                WsMessage::Close(_) => return None,
                // Ping/pong are handled by tungstenite; binary frames are not
                // part of the protocol.
                _ => continue,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
