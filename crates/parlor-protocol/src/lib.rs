//! Wire protocol for Parlor.
//!
//! Names and encodings shared by clients and rooms:
//!
//! - **Types** ([`PlayerId`], [`RoomName`], [`Recipient`], [`Point`],
//!   [`Direction`]): identities and the values that travel on the wire.
//! - **Framing** ([`WireMessage`], [`Frame`]): how a room's outbound
//!   message becomes one text frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how structured messages
//!   are converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Nothing here knows about connections or locks.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Room (state + membership)
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{Frame, WireMessage};
pub use types::{Direction, PlayerId, Point, Recipient, RoomName};
