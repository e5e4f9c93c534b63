//! Transport seam between the connection manager and the wire.
//!
//! The reconnection policy in [`super::ConnectionManager`] is written against
//! these traits rather than `tokio-tungstenite` directly, so the policy can be
//! exercised in tests with a scripted transport. Production code uses
//! [`WsConnector`].

#![expect(
    clippy::module_name_repetitions,
    reason = "Transport types expose their domain in the name for clarity"
)]

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::error::WsError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live full-duplex text-frame connection.
///
/// Exactly one transport is owned by the connection manager at a time; the
/// manager drops a superseded transport before starting a new attempt.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<(), WsError>;

    /// Receive the next inbound text frame.
    ///
    /// Returns `None` once the connection has closed, for any reason. An
    /// `Err` item is a transport fault that did not (yet) close the
    /// connection; callers should keep polling until `None`.
    async fn next_frame(&mut self) -> Option<Result<String, WsError>>;

    /// Close the connection gracefully. Best effort.
    async fn close(&mut self);
}

/// Factory for [`Transport`] instances, one call per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, WsError>;
}

/// Production connector over `tokio-tungstenite`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, WsError> {
        let (stream, _response) = connect_async(url).await.map_err(WsError::Connection)?;
        Ok(WsTransport { inner: stream })
    }
}

/// Production transport wrapping a tungstenite WebSocket stream.
pub struct WsTransport {
    inner: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), WsError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(WsError::Connection)
    }

    async fn next_frame(&mut self) -> Option<Result<String, WsError>> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => {
                    // Ignore binary frames and ping/pong control frames.
                }
                Err(e) => return Some(Err(WsError::Connection(e))),
            }
        }
        None
    }

    async fn close(&mut self) {
        _ = self.inner.close(None).await;
    }
}
