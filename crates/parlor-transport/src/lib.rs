//! Client channel abstraction for Parlor.
//!
//! Provides the [`Transport`] and [`Connection`] traits. Rooms never
//! touch sockets; each session task owns one [`Connection`], with a send
//! primitive and a receive that fails (or reports a clean close) once
//! the peer is gone.
//!
//! # Implementations
//!
//! - [`WebSocketTransport`] / [`WebSocketConnection`]: WebSocket via
//!   `tokio-tungstenite` (feature `websocket`, on by default). The
//!   connection remembers the request path so the server can route
//!   `/ws/<room>` to a room.
//! - [`memory::pair`]: an in-process channel pair. Tests and embedders
//!   drive a server without opening a socket.

mod error;
pub mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{IncomingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Process-unique connection number, shown in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of new client channels, e.g. a listening socket.
///
/// `accept` only takes the raw connection off the listener. The protocol
/// handshake lives in [`Upgrade`] so it can run on the client's own task,
/// where a peer that never finishes it holds up nobody else.
pub trait Transport: Send + Sync + 'static {
    type Incoming: Upgrade<Error = Self::Error>;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolves with the next client that opened a connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Incoming, Self::Error>> + Send;
}

/// An accepted client that has not finished its handshake yet.
pub trait Upgrade: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Completes the handshake. Callers bound this with a timeout.
    fn upgrade(self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// One client's bidirectional channel.
///
/// All methods take `&self` so one task can write while another is
/// parked in [`recv`](Self::recv). Futures are `Send` so a generic
/// session task can be handed to `tokio::spawn`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends raw bytes to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Sends one text frame. Defaults to [`send`](Self::send) of the
    /// UTF-8 bytes; transports with distinct text framing override it.
    fn send_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.send(text.as_bytes())
    }

    /// Waits for the next inbound frame. `Ok(None)` means the client
    /// hung up cleanly; an error means the channel broke.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Hangs up. Frames already sent are still delivered.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;

    /// The request path the client connected with, if the transport has
    /// one (e.g. `/ws/lobby`).
    fn path(&self) -> Option<&str> {
        None
    }
}
