//! Structured encodings for messages that are not plain sentences.
//!
//! Snake events travel as JSON objects; [`JsonCodec`] produces them.
//! Plain-text games never touch a codec.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts serde values to and from bytes.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Fails with [`ProtocolError::Decode`] on malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes `value` for a text channel. Fails with
    /// [`ProtocolError::NotText`] if the encoding is not UTF-8.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        String::from_utf8(self.encode(value)?).map_err(|_| ProtocolError::NotText)
    }
}

/// Compact JSON via `serde_json` (feature `json`, on by default).
///
/// ```rust
/// use parlor_protocol::{Codec, JsonCodec, Point};
///
/// let text = JsonCodec.encode_text(&Point { x: 3, y: 4 }).unwrap();
/// assert_eq!(text, r#"{"x":3,"y":4}"#);
/// let back: Point = JsonCodec.decode(text.as_bytes()).unwrap();
/// assert_eq!(back, Point { x: 3, y: 4 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
