//! Per-connection session task: routing, join, and the read/write loops.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Resolve the room from the request path, creating it if needed
//!   2. Join with a fresh outbound queue, then greet
//!   3. Spawn a writer that drains the queue into the connection
//!   4. Loop: receive frames → `Room::handle_text`
//!   5. Leave the room; the writer flushes what is queued and closes
//!
//! A session only ever holds its own connection, its player id and the
//! room handle. Everything shared lives behind the room's guard.

use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::{Frame, PlayerId};
use parlor_room::{Room, RoomLogic};
use parlor_transport::Connection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::server::ServerState;
use crate::ParlorError;

/// Drop guard that takes the player out of the room when the session
/// ends without reaching its explicit leave (panic or cancellation).
///
/// Since `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async lock.
struct LeaveGuard<G: RoomLogic> {
    room: Arc<Room<G>>,
    player: PlayerId,
    armed: bool,
}

impl<G: RoomLogic> LeaveGuard<G> {
    async fn leave(mut self) {
        self.armed = false;
        self.room.leave(self.player).await;
    }
}

impl<G: RoomLogic> Drop for LeaveGuard<G> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let room = Arc::clone(&self.room);
        let player = self.player;
        runtime.spawn(async move {
            room.leave(player).await;
        });
    }
}

/// Why the read loop stopped.
#[derive(Debug)]
enum ReadEnd {
    /// The client closed the channel.
    Closed,
    /// Receiving failed.
    Failed,
    /// Nothing arrived within the idle timeout.
    Idle,
    /// The room no longer lists this player (evicted).
    Evicted,
    /// The writer gave up, so the client cannot be reached anymore.
    WriterDone,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, G>(
    conn: C,
    state: Arc<ServerState<G>>,
) -> Result<(), ParlorError>
where
    C: Connection,
    G: RoomLogic,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let room_name = state.config.room_for_path(conn.path());
    let room = state.registry.get_or_create(&room_name).await;

    let (tx, rx) = mpsc::channel(room.config().outbound_capacity);
    let player = match room.join(tx).await {
        Ok(player) => player,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e.into());
        }
    };
    let guard = LeaveGuard {
        room: Arc::clone(&room),
        player,
        armed: true,
    };
    tracing::info!(%conn_id, room = %room_name, %player, "session started");

    let mut writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        rx,
        state.config.send_timeout,
        player,
    ));

    let end = match room.greet(player).await {
        Ok(()) => read_loop(&*conn, &room, player, state.config.idle_timeout, &mut writer).await,
        Err(_) => ReadEnd::Evicted,
    };
    tracing::info!(%conn_id, room = %room_name, %player, reason = ?end, "session ended");

    // Leaving drops the room's sender, so the writer drains and exits.
    guard.leave().await;
    if !matches!(end, ReadEnd::WriterDone) {
        let _ = writer.await;
    }
    Ok(())
}

async fn read_loop<C, G>(
    conn: &C,
    room: &Room<G>,
    player: PlayerId,
    idle_timeout: Option<Duration>,
    writer: &mut JoinHandle<()>,
) -> ReadEnd
where
    C: Connection,
    G: RoomLogic,
{
    loop {
        let received = tokio::select! {
            received = recv_within(conn, idle_timeout) => received,
            _ = &mut *writer => return ReadEnd::WriterDone,
        };

        let data = match received {
            Some(Ok(Some(data))) => data,
            Some(Ok(None)) => return ReadEnd::Closed,
            Some(Err(e)) => {
                tracing::debug!(%player, error = %e, "recv error");
                return ReadEnd::Failed;
            }
            None => return ReadEnd::Idle,
        };

        let text = String::from_utf8_lossy(&data);
        tracing::debug!(room = %room.name(), %player, len = text.len(), "frame received");
        if room.handle_text(player, &text).await.is_err() {
            return ReadEnd::Evicted;
        }
    }
}

/// Receives one frame, giving up after `idle` if set. `None` means the
/// idle timeout elapsed.
async fn recv_within<C: Connection>(
    conn: &C,
    idle: Option<Duration>,
) -> Option<Result<Option<Vec<u8>>, C::Error>> {
    match idle {
        Some(idle) => tokio::time::timeout(idle, conn.recv()).await.ok(),
        None => Some(conn.recv().await),
    }
}

/// Drains the player's outbound queue into the connection, in order.
///
/// Ends when the queue closes (the player left or was evicted) or a
/// write fails or times out; either way the connection is closed. Once
/// this returns the queue's receiver is gone, so the room evicts the
/// player on its next send.
async fn write_loop<C: Connection>(
    conn: Arc<C>,
    mut rx: mpsc::Receiver<Frame>,
    send_timeout: Duration,
    player: PlayerId,
) {
    while let Some(frame) = rx.recv().await {
        match tokio::time::timeout(send_timeout, conn.send_text(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%player, error = %e, "send failed");
                break;
            }
            Err(_) => {
                tracing::warn!(
                    %player,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "send timed out, dropping client"
                );
                break;
            }
        }
    }
    drop(rx);
    if let Err(e) = conn.close().await {
        tracing::debug!(%player, error = %e, "close failed");
    }
}
