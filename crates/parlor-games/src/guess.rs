//! Number guessing: the room holds one secret; the first member to hit
//! it wins the round, everybody else present loses, and a new secret is
//! drawn.

use std::ops::RangeInclusive;

use parlor_protocol::{PlayerId, Recipient, RoomName};
use parlor_room::{Effects, Outcome, RoomContext, RoomLogic};
use rand::Rng;

/// Settings for a guessing room.
#[derive(Debug, Clone)]
pub struct GuessConfig {
    /// Range secrets are drawn from, inclusive.
    pub range: RangeInclusive<i64>,
}

impl Default for GuessConfig {
    fn default() -> Self {
        Self { range: 1..=100 }
    }
}

#[derive(Debug, Clone)]
pub struct GuessState {
    pub secret: i64,
    pub range: RangeInclusive<i64>,
    pub rounds_played: u64,
}

impl GuessState {
    fn draw(&mut self) {
        self.secret = rand::rng().random_range(self.range.clone());
    }
}

pub struct GuessNumber;

impl RoomLogic for GuessNumber {
    type Config = GuessConfig;
    type State = GuessState;
    type ClientMessage = i64;
    type ServerMessage = String;

    fn init(config: &GuessConfig, room: &RoomName) -> GuessState {
        let range = if config.range.is_empty() {
            tracing::warn!(%room, range = ?config.range, "empty secret range, using default");
            GuessConfig::default().range
        } else {
            config.range.clone()
        };
        let mut state = GuessState {
            secret: *range.start(),
            range,
            rounds_played: 0,
        };
        state.draw();
        state
    }

    fn parse_message(text: &str) -> Result<i64, String> {
        text.trim()
            .parse()
            .map_err(|_| "please enter a valid number".to_string())
    }

    fn on_join(
        _state: &mut GuessState,
        ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<String> {
        Effects::broadcast(format!(
            "player {player} joined room {}, players: {}",
            ctx.room(),
            ctx.member_count()
        ))
    }

    fn handle_message(
        state: &mut GuessState,
        ctx: &RoomContext<'_>,
        sender: PlayerId,
        guess: i64,
    ) -> Effects<String> {
        if guess < state.secret {
            return Effects::reply(sender, "too low".to_string());
        }
        if guess > state.secret {
            return Effects::reply(sender, "too high".to_string());
        }

        let mut fx = Effects::broadcast(format!(
            "player {sender} guessed it! the answer was {}",
            state.secret
        ));
        fx.record(Outcome::win(sender, ctx.room()));
        for &other in ctx.members().iter().filter(|&&p| p != sender) {
            fx.record(Outcome::lose(other, ctx.room()));
        }

        state.rounds_played += 1;
        state.draw();
        tracing::debug!(room = %ctx.room(), winner = %sender, round = state.rounds_played, "round won");

        fx.send(Recipient::All, "new round! keep guessing".to_string());
        fx
    }

    fn on_leave(
        _state: &mut GuessState,
        ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<String> {
        Effects::broadcast(format!(
            "player {player} left room {}, players: {}",
            ctx.room(),
            ctx.member_count()
        ))
    }
}
