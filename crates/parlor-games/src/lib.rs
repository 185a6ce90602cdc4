//! Game variants for Parlor.
//!
//! Each variant is a unit struct implementing
//! [`RoomLogic`](parlor_room::RoomLogic):
//!
//! - [`Chat`]: relays every line to the whole room
//! - [`GuessNumber`]: first to guess the secret wins the round
//! - [`RockPaperScissors`]: two-player rounds
//! - [`Snake`]: grid snake on a 200 ms simulation tick

mod chat;
mod guess;
mod rps;
mod snake;

pub use chat::Chat;
pub use guess::{GuessConfig, GuessNumber, GuessState};
pub use rps::{Move, RockPaperScissors, RpsState};
pub use snake::{Snake, SnakeConfig, SnakeCommand, SnakeEvent, SnakeState, SnakeView};
