//! Unified error type for Parlor.

use parlor_protocol::ProtocolError;
use parlor_room::{RoomError, SinkError};
use parlor_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `parlor` crate you deal with this single error type
/// instead of importing errors from each layer. The `#[from]` attribute
/// on each variant lets `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not a member, room stopped).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The outcome sink refused a record.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Local socket inspection failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::{PlayerId, RoomName};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Transport(_)));
        assert!(parlor_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotInRoom(PlayerId(3), RoomName::new("r1"));
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Room(_)));
        assert_eq!(parlor_err.to_string(), "player P3 not in room r1");
    }

    #[test]
    fn test_from_sink_error() {
        let parlor_err: ParlorError = SinkError::Unavailable("db down".into()).into();
        assert!(matches!(parlor_err, ParlorError::Sink(_)));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Io(_)));
    }
}
