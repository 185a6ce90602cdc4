//! `ParlorServer` builder and server loop.
//!
//! This is the entry point for running a Parlor server. It ties the
//! layers together: transport → session task → room registry → rooms.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::RoomName;
use parlor_room::{OutcomeSink, RoomLogic, RoomRegistry};
use parlor_transport::{Connection, Transport, Upgrade, WebSocketTransport};
use tokio::task::JoinHandle;

use crate::handler::handle_connection;
use crate::{ParlorError, ServerConfig};

/// Shared server state passed to each session task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry does its own locking.
pub(crate) struct ServerState<G: RoomLogic> {
    pub(crate) registry: RoomRegistry<G>,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Parlor server.
///
/// # Example
///
/// ```rust,ignore
/// use parlor::prelude::*;
///
/// let server = ParlorServer::builder()
///     .bind("0.0.0.0:8080")
///     .build::<MyGame>(Default::default())
///     .await?;
/// server.run().await
/// ```
pub struct ParlorServerBuilder {
    config: ServerConfig,
    sink: Option<Arc<dyn OutcomeSink>>,
}

impl ParlorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            sink: None,
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room for clients that do not name one.
    pub fn default_room(mut self, room: impl Into<RoomName>) -> Self {
        self.config.default_room = room.into();
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets where room outcomes are recorded. Without a sink they are
    /// only logged.
    pub fn outcome_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Binds the listener and builds the server for game variant `G`.
    pub async fn build<G: RoomLogic>(
        self,
        game_config: G::Config,
    ) -> Result<ParlorServer<G>, ParlorError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let registry = match self.sink {
            Some(sink) => RoomRegistry::with_sink(game_config, sink),
            None => RoomRegistry::new(game_config),
        };
        let state = Arc::new(ServerState {
            registry,
            config: self.config,
        });

        Ok(ParlorServer { transport, state })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Parlor server for game variant `G`.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParlorServer<G: RoomLogic> {
    transport: WebSocketTransport,
    state: Arc<ServerState<G>>,
}

impl<G: RoomLogic> ParlorServer<G> {
    /// Creates a new builder.
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ParlorError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// The rooms this server hosts.
    pub fn registry(&self) -> &RoomRegistry<G> {
        &self.state.registry
    }

    /// Spawns a session task for a connection accepted elsewhere, such
    /// as one half of an in-memory pair.
    pub fn serve_connection<C: Connection>(&self, conn: C) -> JoinHandle<()> {
        tokio::spawn(run_session::<C, G>(conn, Arc::clone(&self.state)))
    }

    /// Spawns a task that upgrades a freshly accepted client and then
    /// runs its session. The accept loop never waits on a handshake.
    pub fn serve_incoming<U: Upgrade>(&self, incoming: U) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let limit = state.config.handshake_timeout;
            match tokio::time::timeout(limit, incoming.upgrade()).await {
                Ok(Ok(conn)) => run_session::<U::Connection, G>(conn, state).await,
                Ok(Err(e)) => tracing::debug!(error = %e, "handshake failed"),
                Err(_) => tracing::debug!(?limit, "handshake timed out"),
            }
        })
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ParlorError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops every
    /// room.
    ///
    /// Sessions already running are not cancelled; they end when their
    /// clients disconnect.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ParlorError>
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!(
            addr = %self.config().bind_addr,
            default_room = %self.config().default_room,
            "parlor server running"
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        self.serve_incoming(incoming);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.state.registry.shutdown().await;
        tracing::info!("parlor server stopped");
        Ok(())
    }
}

async fn run_session<C: Connection, G: RoomLogic>(conn: C, state: Arc<ServerState<G>>) {
    let conn_id = conn.id();
    if let Err(e) = handle_connection::<C, G>(conn, state).await {
        tracing::debug!(%conn_id, error = %e, "connection ended with error");
    }
}
