//! Chat room: every line goes to everyone, sender included.

use parlor_protocol::{PlayerId, RoomName};
use parlor_room::{Effects, RoomContext, RoomLogic};

pub struct Chat;

impl RoomLogic for Chat {
    type Config = ();
    type State = ();
    type ClientMessage = String;
    type ServerMessage = String;

    fn init(_config: &(), _room: &RoomName) {}

    fn parse_message(text: &str) -> Result<String, String> {
        Ok(text.to_owned())
    }

    fn handle_message(
        _state: &mut (),
        ctx: &RoomContext<'_>,
        _sender: PlayerId,
        msg: String,
    ) -> Effects<String> {
        Effects::broadcast(format!("[{}] {}", ctx.room(), msg))
    }
}
