//! In-process client channels.
//!
//! [`pair`] returns the server half ([`MemoryConnection`], which
//! implements [`Connection`]) and the client half ([`MemoryPeer`]).
//! Dropping or closing either half makes the other side observe a
//! disconnect, exactly like a socket going away.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, ConnectionId, TransportError};

/// Memory connection ids count down from the top so they never collide
/// with socket ids in logs.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(u64::MAX);

/// Creates a connected pair. `path` is reported by
/// [`Connection::path`] on the server half, e.g. `"/ws/r1"`.
pub fn pair(path: impl Into<String>) -> (MemoryConnection, MemoryPeer) {
    let (to_server, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_server) = mpsc::unbounded_channel();
    let id = ConnectionId::new(NEXT_MEMORY_ID.fetch_sub(1, Ordering::Relaxed));

    let conn = MemoryConnection {
        id,
        path: path.into(),
        inbound: Mutex::new(from_peer),
        outbound: Mutex::new(Some(to_peer)),
    };
    let peer = MemoryPeer {
        outbound: Some(to_server),
        inbound: from_server,
    };
    (conn, peer)
}

/// Server half of an in-memory channel.
pub struct MemoryConnection {
    id: ConnectionId,
    path: String,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        };
        tx.send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn path(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Client half of an in-memory channel.
pub struct MemoryPeer {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryPeer {
    /// Sends one text frame to the server.
    pub fn send_text(&self, text: &str) -> Result<(), TransportError> {
        let Some(tx) = self.outbound.as_ref() else {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        };
        tx.send(text.as_bytes().to_vec())
            .map_err(|_| TransportError::ConnectionClosed("server dropped".into()))
    }

    /// Waits for the next frame from the server as text.
    ///
    /// Returns `None` once the server closed its half.
    pub async fn recv_text(&mut self) -> Option<String> {
        self.inbound
            .recv()
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Hangs up: the server's next `recv` reports a clean close.
    pub fn close(&mut self) {
        self.outbound.take();
    }
}
