//! WebSocket client channels over `tokio-tungstenite`.
//!
//! [`WebSocketTransport::accept`] hands out the bare TCP stream as an
//! [`IncomingWebSocket`]; the upgrade runs later on the client's task.
//! The upgrade callback records the request path, which is how the
//! server learns the room a client asked for. After the upgrade the
//! stream is split so a session's writer can send while its reader is
//! parked in `recv`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{Connection, ConnectionId, Transport, TransportError, Upgrade};

static SOCKET_IDS: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Listens for WebSocket clients on a TCP address.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds the listener. Port `0` picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        tracing::info!(addr, "listening for websocket clients");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Incoming = IncomingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<IncomingWebSocket, TransportError> {
        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%peer, "tcp connection accepted");
        Ok(IncomingWebSocket { tcp, peer })
    }
}

/// A TCP client that has not sent its upgrade request yet.
#[derive(Debug)]
pub struct IncomingWebSocket {
    tcp: TcpStream,
    peer: SocketAddr,
}

impl IncomingWebSocket {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Upgrade for IncomingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self { tcp, peer } = self;

        let mut path = String::from("/");
        let record_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            path = req.uri().path().to_string();
            Ok(resp)
        };
        let ws = tokio_tungstenite::accept_hdr_async(tcp, record_path)
            .await
            .map_err(|e| TransportError::Handshake(format!("{peer}: {e}")))?;

        let id = ConnectionId::new(SOCKET_IDS.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, %path, "websocket client connected");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            path,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// One upgraded WebSocket client.
pub struct WebSocketConnection {
    id: ConnectionId,
    path: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    async fn push(&self, msg: Message) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::other(e)))
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.push(Message::Binary(data.to_vec().into())).await
    }

    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.push(Message::Text(text.to_owned().into())).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(msg) = stream.next().await {
            match msg.map_err(|e| TransportError::ReceiveFailed(io::Error::other(e)))? {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(data) => return Ok(Some(data.to_vec())),
                Message::Close(_) => return Ok(None),
                // Pings are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::other(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn path(&self) -> Option<&str> {
        Some(&self.path)
    }
}
