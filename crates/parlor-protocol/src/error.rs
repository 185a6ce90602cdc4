//! Error types for the protocol layer.
//!
//! Each crate in Parlor defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in naming or serialization,
//! not in networking or room management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An encoded frame was not valid UTF-8 text.
    #[error("frame is not valid utf-8")]
    NotText,

    /// The message is invalid at the protocol level, e.g. a player id
    /// without the `P` prefix or an unknown direction name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
