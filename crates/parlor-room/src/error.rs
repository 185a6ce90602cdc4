//! Error types for the room layer.

use parlor_protocol::{PlayerId, RoomName};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The player is not a member of this room (never joined, already
    /// left, or was evicted).
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomName),

    /// The room has been stopped and no longer admits players.
    #[error("room {0} is stopped")]
    Stopped(RoomName),
}

/// Errors reported by an [`OutcomeSink`](crate::OutcomeSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backing store could not be reached.
    #[error("outcome sink unavailable: {0}")]
    Unavailable(String),

    /// The backing store refused the record.
    #[error("outcome rejected: {0}")]
    Rejected(String),
}
