//! Rock-paper-scissors for exactly two players.
//!
//! Every move is announced. When the room holds exactly two members and
//! both have moved, the round resolves and both moves are cleared. With
//! three or more members rounds never resolve.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use parlor_protocol::{PlayerId, Recipient, RoomName};
use parlor_room::{Effects, Outcome, RoomContext, RoomLogic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// Returns `true` if `self` beats `other`.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissors" => Ok(Move::Scissors),
            other => Err(format!(
                "unknown move: {other} (expected rock, paper or scissors)"
            )),
        }
    }
}

/// Pending move per member; a member without an entry has not moved.
#[derive(Debug, Clone, Default)]
pub struct RpsState {
    pub moves: BTreeMap<PlayerId, Move>,
}

pub struct RockPaperScissors;

impl RoomLogic for RockPaperScissors {
    type Config = ();
    type State = RpsState;
    type ClientMessage = Move;
    type ServerMessage = String;

    fn init(_config: &(), _room: &RoomName) -> RpsState {
        RpsState::default()
    }

    fn parse_message(text: &str) -> Result<Move, String> {
        text.parse()
    }

    fn on_join(
        _state: &mut RpsState,
        ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<String> {
        Effects::broadcast(format!("player {player} joined room {}", ctx.room()))
    }

    fn handle_message(
        state: &mut RpsState,
        ctx: &RoomContext<'_>,
        sender: PlayerId,
        mv: Move,
    ) -> Effects<String> {
        state.moves.insert(sender, mv);
        let mut fx = Effects::broadcast(format!("player {sender} played {mv}"));

        let &[first, second] = ctx.members() else {
            return fx;
        };
        let (Some(&a), Some(&b)) = (state.moves.get(&first), state.moves.get(&second))
        else {
            return fx;
        };

        let result = if a == b {
            "result: draw".to_string()
        } else {
            let (winner, loser) = if a.beats(b) { (first, second) } else { (second, first) };
            fx.record(Outcome::win(winner, ctx.room()));
            fx.record(Outcome::lose(loser, ctx.room()));
            format!("result: player {winner} wins!")
        };
        tracing::debug!(room = %ctx.room(), %result, "round resolved");
        fx.send(Recipient::All, result);

        state.moves.remove(&first);
        state.moves.remove(&second);
        fx
    }

    fn on_leave(
        state: &mut RpsState,
        ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<String> {
        state.moves.remove(&player);
        Effects::broadcast(format!("player {player} left room {}", ctx.room()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_room::OutcomeResult;

    #[test]
    fn test_beats_relation() {
        use Move::*;
        assert!(Rock.beats(Scissors));
        assert!(Scissors.beats(Paper));
        assert!(Paper.beats(Rock));
        for m in [Rock, Paper, Scissors] {
            assert!(!m.beats(m));
        }
        assert!(!Scissors.beats(Rock));
        assert!(!Paper.beats(Scissors));
        assert!(!Rock.beats(Paper));
    }

    #[test]
    fn test_parse_moves() {
        assert_eq!("rock".parse::<Move>().unwrap(), Move::Rock);
        assert_eq!("scissors\n".parse::<Move>().unwrap(), Move::Scissors);
        assert_eq!(
            "lizard".parse::<Move>().unwrap_err(),
            "unknown move: lizard (expected rock, paper or scissors)"
        );
    }

    fn play(
        state: &mut RpsState,
        members: &[PlayerId],
        sender: PlayerId,
        mv: Move,
    ) -> Effects<String> {
        let room = RoomName::new("r1");
        let ctx = RoomContext::new(&room, members);
        RockPaperScissors::handle_message(state, &ctx, sender, mv)
    }

    fn texts(fx: &Effects<String>) -> Vec<&str> {
        fx.messages.iter().map(|(_, m)| m.as_str()).collect()
    }

    #[test]
    fn test_two_players_resolve_and_clear() {
        let members = [PlayerId(1), PlayerId(2)];
        let mut st = RpsState::default();

        let fx = play(&mut st, &members, PlayerId(2), Move::Paper);
        assert_eq!(texts(&fx), ["player P2 played paper"]);

        let fx = play(&mut st, &members, PlayerId(1), Move::Scissors);
        assert_eq!(
            texts(&fx),
            ["player P1 played scissors", "result: player P1 wins!"]
        );
        let results: Vec<_> = fx.outcomes.iter().map(|o| (o.player, o.result)).collect();
        assert_eq!(
            results,
            vec![(PlayerId(1), OutcomeResult::Win), (PlayerId(2), OutcomeResult::Lose)]
        );
        assert!(st.moves.is_empty());
    }

    #[test]
    fn test_equal_moves_draw() {
        let members = [PlayerId(1), PlayerId(2)];
        let mut st = RpsState::default();
        play(&mut st, &members, PlayerId(1), Move::Rock);
        let fx = play(&mut st, &members, PlayerId(2), Move::Rock);
        assert_eq!(texts(&fx).last(), Some(&"result: draw"));
        assert!(fx.outcomes.is_empty());
        assert!(st.moves.is_empty());
    }

    #[test]
    fn test_no_resolution_without_exactly_two() {
        let mut st = RpsState::default();
        let fx = play(&mut st, &[PlayerId(1)], PlayerId(1), Move::Rock);
        assert_eq!(texts(&fx).len(), 1);

        let three = [PlayerId(1), PlayerId(2), PlayerId(3)];
        let mut st = RpsState::default();
        for (p, mv) in [(1, Move::Rock), (2, Move::Scissors), (3, Move::Paper)] {
            let fx = play(&mut st, &three, PlayerId(p), mv);
            assert_eq!(texts(&fx).len(), 1, "no result with three members");
        }
        assert_eq!(st.moves.len(), 3);
    }

    #[test]
    fn test_move_can_change_before_resolution() {
        let members = [PlayerId(1), PlayerId(2)];
        let mut st = RpsState::default();
        play(&mut st, &members, PlayerId(1), Move::Rock);
        play(&mut st, &members, PlayerId(1), Move::Paper);
        let fx = play(&mut st, &members, PlayerId(2), Move::Rock);
        assert_eq!(texts(&fx).last(), Some(&"result: player P1 wins!"));
    }

    #[test]
    fn test_leave_clears_pending_move() {
        let room = RoomName::new("r1");
        let mut st = RpsState::default();
        st.moves.insert(PlayerId(1), Move::Rock);
        let members = [PlayerId(2)];
        let ctx = RoomContext::new(&room, &members);
        let fx = RockPaperScissors::on_leave(&mut st, &ctx, PlayerId(1));
        assert!(st.moves.is_empty());
        assert_eq!(texts(&fx), ["player P1 left room r1"]);
    }
}
