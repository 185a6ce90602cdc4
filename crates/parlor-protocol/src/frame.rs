//! Text framing for outbound room messages.
//!
//! Every message a room sends ends up as exactly one text frame on the
//! client's channel. Chat-style games send plain sentences; the snake
//! game sends JSON objects (and the odd bare `"pong"`). [`WireMessage`]
//! hides that difference from the room: the room asks for a frame once
//! per dispatch and fans the same [`Frame`] out to every recipient.

use std::sync::Arc;

use crate::ProtocolError;

/// One encoded text frame, cheap to clone across many recipients.
pub type Frame = Arc<str>;

/// A server message that knows how to render itself as a text frame.
pub trait WireMessage: Send + Sync + Clone + 'static {
    /// Renders this message as the exact text the client receives.
    fn to_frame(&self) -> Result<Frame, ProtocolError>;
}

/// Plain sentences go out verbatim.
impl WireMessage for String {
    fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Ok(Arc::from(self.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_frames_verbatim() {
        let frame = "[lobby] hi".to_string().to_frame().unwrap();
        assert_eq!(&*frame, "[lobby] hi");
    }

    #[test]
    fn test_frame_clone_shares_allocation() {
        let frame = "hello".to_string().to_frame().unwrap();
        let copy = Arc::clone(&frame);
        assert!(Arc::ptr_eq(&frame, &copy));
    }
}
