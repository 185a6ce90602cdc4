//! Multiplayer snake on a fixed grid.
//!
//! The room ticks every 200 ms. Each tick every live snake tries to step
//! one cell along its heading, and all steps are judged against the
//! board as it was when the tick began, so the order snakes are visited
//! in never matters. A step dies on the first of: leaving the board,
//! hitting its own body, hitting any other snake's body (dead snakes
//! stay on the board). Otherwise the snake advances; landing on the food
//! grows it by one and scores a point.
//!
//! Clients send `up`/`down`/`left`/`right`/`ping` and receive JSON
//! [`SnakeEvent`]s, except `ping` which is answered with a bare `pong`.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::{
    Codec, Direction, Frame, JsonCodec, PlayerId, ProtocolError, Recipient, Point,
    RoomName, WireMessage,
};
use parlor_room::{Effects, Outcome, RoomConfig, RoomContext, RoomLogic};
use rand::Rng;
use serde::Serialize;

/// Simulation interval.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Board settings.
#[derive(Debug, Clone)]
pub struct SnakeConfig {
    pub width: i32,
    pub height: i32,
    /// Random draws tried before food placement gives up and keeps the
    /// previous cell.
    pub food_attempts: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            food_attempts: 200,
        }
    }
}

/// One snake as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnakeView {
    pub id: PlayerId,
    /// Head first.
    pub body: VecDeque<Point>,
    pub dir: Direction,
    pub score: u32,
    pub alive: bool,
    /// Heading of the last step actually taken. Turns are checked
    /// against this, so two quick turns inside one tick cannot reverse.
    #[serde(skip)]
    last_step: Direction,
}

impl SnakeView {
    fn spawn(id: PlayerId, at: Point) -> Self {
        Self {
            id,
            body: VecDeque::from([at]),
            dir: Direction::Right,
            score: 0,
            alive: true,
            last_step: Direction::Right,
        }
    }

    pub fn head(&self) -> Point {
        // Bodies are never empty.
        self.body.front().copied().unwrap_or(Point { x: -1, y: -1 })
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Applies a turn unless it would reverse the last step.
    fn turn(&mut self, dir: Direction) -> bool {
        if !self.alive || dir == self.last_step.opposite() {
            return false;
        }
        self.dir = dir;
        true
    }
}

/// Authoritative board state.
#[derive(Debug, Clone)]
pub struct SnakeState {
    pub room: RoomName,
    pub width: i32,
    pub height: i32,
    pub food: Point,
    pub snakes: BTreeMap<PlayerId, SnakeView>,
    food_attempts: usize,
}

impl SnakeState {
    fn occupied(&self) -> HashSet<Point> {
        self.snakes
            .values()
            .flat_map(|s| s.body.iter().copied())
            .collect()
    }

    /// A uniformly drawn cell not in `taken`, or `None` after
    /// `food_attempts` misses.
    fn random_free_cell(&self, taken: &HashSet<Point>) -> Option<Point> {
        let mut rng = rand::rng();
        (0..self.food_attempts)
            .map(|_| Point {
                x: rng.random_range(0..self.width),
                y: rng.random_range(0..self.height),
            })
            .find(|p| !taken.contains(p))
    }

    fn spawn_point(&self) -> Point {
        let mut taken = self.occupied();
        taken.insert(self.food);
        self.random_free_cell(&taken)
            .or_else(|| {
                (0..self.height)
                    .flat_map(|y| (0..self.width).map(move |x| Point { x, y }))
                    .find(|p| !taken.contains(p))
            })
            .unwrap_or(Point { x: 0, y: 0 })
    }

    fn snapshot(&self) -> BTreeMap<PlayerId, SnakeView> {
        self.snakes.clone()
    }

    /// Places a snake with a fixed body (head first), replacing any
    /// snake with the same id. For tools and tests that need a known
    /// layout. An empty body is ignored.
    pub fn place(&mut self, id: PlayerId, body: &[Point], dir: Direction) {
        let Some(&head) = body.first() else {
            return;
        };
        let mut snake = SnakeView::spawn(id, head);
        snake.body = body.iter().copied().collect();
        snake.dir = dir;
        snake.last_step = dir;
        self.snakes.insert(id, snake);
    }
}

/// An inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeCommand {
    Turn(Direction),
    Ping,
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnakeEvent {
    /// Private, on join.
    Welcome {
        player: PlayerId,
        room: RoomName,
        w: i32,
        h: i32,
        food: Point,
        players: BTreeMap<PlayerId, SnakeView>,
    },
    /// Broadcast after every tick.
    State {
        players: BTreeMap<PlayerId, SnakeView>,
        food: Point,
        room: RoomName,
        w: i32,
        h: i32,
    },
    Leave {
        player: PlayerId,
    },
    /// Private, for unrecognized commands.
    Error {
        message: String,
    },
    /// Rendered as the bare text `pong`.
    Pong,
}

impl WireMessage for SnakeEvent {
    fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            SnakeEvent::Pong => Ok(Arc::from("pong")),
            event => JsonCodec.encode_text(event).map(Arc::from),
        }
    }
}

pub struct Snake;

impl RoomLogic for Snake {
    type Config = SnakeConfig;
    type State = SnakeState;
    type ClientMessage = SnakeCommand;
    type ServerMessage = SnakeEvent;

    fn room_config() -> RoomConfig {
        RoomConfig::ticking(TICK_INTERVAL)
    }

    fn init(config: &SnakeConfig, room: &RoomName) -> SnakeState {
        let width = config.width.max(1);
        let height = config.height.max(1);
        let mut rng = rand::rng();
        SnakeState {
            room: room.clone(),
            width,
            height,
            food: Point {
                x: rng.random_range(0..width),
                y: rng.random_range(0..height),
            },
            snakes: BTreeMap::new(),
            food_attempts: config.food_attempts,
        }
    }

    fn parse_message(text: &str) -> Result<SnakeCommand, SnakeEvent> {
        match text.trim() {
            "ping" => Ok(SnakeCommand::Ping),
            other => other.parse().map(SnakeCommand::Turn).map_err(|_| {
                SnakeEvent::Error {
                    message: format!("unknown command: {other}"),
                }
            }),
        }
    }

    fn add_player(state: &mut SnakeState, _ctx: &RoomContext<'_>, player: PlayerId) {
        let at = state.spawn_point();
        state.snakes.insert(player, SnakeView::spawn(player, at));
    }

    fn on_join(
        state: &mut SnakeState,
        _ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<SnakeEvent> {
        Effects::reply(
            player,
            SnakeEvent::Welcome {
                player,
                room: state.room.clone(),
                w: state.width,
                h: state.height,
                food: state.food,
                players: state.snapshot(),
            },
        )
    }

    fn handle_message(
        state: &mut SnakeState,
        _ctx: &RoomContext<'_>,
        sender: PlayerId,
        cmd: SnakeCommand,
    ) -> Effects<SnakeEvent> {
        match cmd {
            SnakeCommand::Ping => Effects::reply(sender, SnakeEvent::Pong),
            SnakeCommand::Turn(dir) => {
                if let Some(snake) = state.snakes.get_mut(&sender) {
                    if !snake.turn(dir) {
                        tracing::trace!(player = %sender, %dir, "turn ignored");
                    }
                }
                Effects::none()
            }
        }
    }

    fn on_leave(
        state: &mut SnakeState,
        ctx: &RoomContext<'_>,
        player: PlayerId,
    ) -> Effects<SnakeEvent> {
        let mut fx = Effects::broadcast(SnakeEvent::Leave { player });
        if let Some(snake) = state.snakes.remove(&player) {
            if snake.alive {
                fx.record(Outcome::score(player, ctx.room(), snake.score));
            }
        }
        fx
    }

    fn tick(
        state: &mut SnakeState,
        ctx: &RoomContext<'_>,
        _dt: Duration,
    ) -> Effects<SnakeEvent> {
        let mut fx = Effects::none();

        // Decide every step against the pre-tick board.
        let mut deaths = Vec::new();
        let mut steps = Vec::new();
        for (&id, snake) in &state.snakes {
            if !snake.alive {
                continue;
            }
            let next = snake.head().step(snake.dir);
            let cause = if !next.within(state.width, state.height) {
                Some("wall")
            } else if snake.body.contains(&next) {
                Some("self")
            } else if state
                .snakes
                .values()
                .any(|other| other.id != id && other.body.contains(&next))
            {
                Some("snake")
            } else {
                None
            };
            match cause {
                Some(cause) => deaths.push((id, cause)),
                None => steps.push((id, next)),
            }
        }

        for (id, cause) in deaths {
            if let Some(snake) = state.snakes.get_mut(&id) {
                snake.alive = false;
                tracing::debug!(room = %ctx.room(), player = %id, cause, score = snake.score, "snake died");
                fx.record(Outcome::score(id, ctx.room(), snake.score));
            }
        }

        let mut food_eaten = false;
        for (id, next) in steps {
            let Some(snake) = state.snakes.get_mut(&id) else {
                continue;
            };
            snake.body.push_front(next);
            snake.last_step = snake.dir;
            if next == state.food {
                snake.score += 1;
                food_eaten = true;
            } else {
                snake.body.pop_back();
            }
        }

        if food_eaten {
            let taken = state.occupied();
            state.food = state.random_free_cell(&taken).unwrap_or(state.food);
        }

        fx.send(
            Recipient::All,
            SnakeEvent::State {
                players: state.snapshot(),
                food: state.food,
                room: state.room.clone(),
                w: state.width,
                h: state.height,
            },
        );
        fx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    fn board() -> SnakeState {
        let mut state = Snake::init(&SnakeConfig::default(), &RoomName::new("arena"));
        state.food = p(19, 19);
        state
    }

    fn tick(state: &mut SnakeState) -> Effects<SnakeEvent> {
        let room = RoomName::new("arena");
        let ids: Vec<_> = state.snakes.keys().copied().collect();
        let ctx = RoomContext::new(&room, &ids);
        Snake::tick(state, &ctx, TICK_INTERVAL)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Snake::parse_message("up").unwrap(), SnakeCommand::Turn(Direction::Up));
        assert_eq!(Snake::parse_message("ping").unwrap(), SnakeCommand::Ping);
        let err = Snake::parse_message("jump").unwrap_err();
        assert_eq!(
            &*err.to_frame().unwrap(),
            r#"{"type":"error","message":"unknown command: jump"}"#
        );
    }

    #[test]
    fn test_pong_is_bare_text() {
        assert_eq!(&*SnakeEvent::Pong.to_frame().unwrap(), "pong");
        let leave = SnakeEvent::Leave { player: PlayerId(2) }.to_frame().unwrap();
        assert_eq!(&*leave, r#"{"type":"leave","player":"P2"}"#);
    }

    #[test]
    fn test_advance_keeps_length() {
        let mut st = board();
        st.place(PlayerId(1), &[p(5, 5), p(4, 5), p(3, 5)], Direction::Right);
        tick(&mut st);
        let snake = &st.snakes[&PlayerId(1)];
        assert_eq!(snake.body, VecDeque::from([p(6, 5), p(5, 5), p(4, 5)]));
        assert!(snake.alive);
    }

    #[test]
    fn test_wall_kills_and_records_score() {
        let mut st = board();
        st.place(PlayerId(1), &[p(19, 3)], Direction::Right);
        st.snakes.get_mut(&PlayerId(1)).unwrap().score = 4;

        let fx = tick(&mut st);
        let snake = &st.snakes[&PlayerId(1)];
        assert!(!snake.alive);
        assert_eq!(snake.body, VecDeque::from([p(19, 3)]), "dead snakes do not move");
        assert_eq!(fx.outcomes, vec![Outcome::score(PlayerId(1), &RoomName::new("arena"), 4)]);

        // No further deaths or outcomes.
        let fx = tick(&mut st);
        assert!(fx.outcomes.is_empty());
    }

    #[test]
    fn test_self_collision() {
        let mut st = board();
        // Head at (5,5) turning down into its own body at (5,6).
        st.place(
            PlayerId(1),
            &[p(5, 5), p(6, 5), p(6, 6), p(5, 6), p(4, 6)],
            Direction::Down,
        );
        tick(&mut st);
        assert!(!st.snakes[&PlayerId(1)].alive);
    }

    #[test]
    fn test_food_grows_by_one_and_moves_food() {
        let mut st = board();
        st.place(PlayerId(1), &[p(5, 5), p(4, 5)], Direction::Right);
        st.food = p(6, 5);

        tick(&mut st);
        let snake = &st.snakes[&PlayerId(1)];
        assert_eq!(snake.body, VecDeque::from([p(6, 5), p(5, 5), p(4, 5)]));
        assert_eq!(snake.score, 1);
        assert_ne!(st.food, p(6, 5));
        assert!(!snake.body.contains(&st.food));
    }

    #[test]
    fn test_food_never_lands_on_a_body() {
        let mut st = board();
        st.place(PlayerId(1), &[p(1, 0), p(0, 0)], Direction::Right);
        for _ in 0..15 {
            st.food = st.snakes[&PlayerId(1)].head().step(Direction::Right);
            tick(&mut st);
            let occupied = st.occupied();
            assert!(!occupied.contains(&st.food));
        }
        assert_eq!(st.snakes[&PlayerId(1)].len(), 17);
    }

    #[test]
    fn test_food_falls_back_when_board_is_full() {
        let mut st = Snake::init(
            &SnakeConfig { width: 2, height: 1, food_attempts: 5 },
            &RoomName::new("tiny"),
        );
        st.place(PlayerId(1), &[p(0, 0)], Direction::Right);
        st.food = p(1, 0);
        tick(&mut st);
        assert_eq!(st.snakes[&PlayerId(1)].len(), 2);
        assert_eq!(st.food, p(1, 0), "no free cell, previous food kept");
    }

    #[test]
    fn test_moves_are_judged_against_pre_tick_bodies() {
        let mut st = board();
        // P1 moves right into (6,5), the tail cell P2 vacates this tick.
        // Judged against the pre-tick board that cell is still occupied.
        st.place(PlayerId(1), &[p(5, 5)], Direction::Right);
        st.place(PlayerId(2), &[p(6, 4), p(6, 5)], Direction::Up);

        tick(&mut st);
        assert!(!st.snakes[&PlayerId(1)].alive);
        assert!(st.snakes[&PlayerId(2)].alive);
        assert_eq!(st.snakes[&PlayerId(2)].body, VecDeque::from([p(6, 3), p(6, 4)]));

        // Same layout with ids swapped gives the same result.
        let mut st = board();
        st.place(PlayerId(2), &[p(5, 5)], Direction::Right);
        st.place(PlayerId(1), &[p(6, 4), p(6, 5)], Direction::Up);
        tick(&mut st);
        assert!(!st.snakes[&PlayerId(2)].alive);
        assert!(st.snakes[&PlayerId(1)].alive);
    }

    #[test]
    fn test_dead_snakes_remain_obstacles() {
        let mut st = board();
        st.place(PlayerId(1), &[p(19, 5), p(18, 5)], Direction::Right);
        st.place(PlayerId(2), &[p(18, 7)], Direction::Up);
        tick(&mut st); // P1 hits the wall; P2 moves to (18,6)
        assert!(!st.snakes[&PlayerId(1)].alive);
        tick(&mut st); // P2 runs into P1's corpse at (18,5)
        assert!(!st.snakes[&PlayerId(2)].alive);
    }

    #[test]
    fn test_no_reversal_within_a_tick() {
        let mut st = board();
        st.place(PlayerId(1), &[p(5, 5), p(4, 5)], Direction::Right);
        let room = RoomName::new("arena");
        let ids = [PlayerId(1)];
        let ctx = RoomContext::new(&room, &ids);

        Snake::handle_message(&mut st, &ctx, PlayerId(1), SnakeCommand::Turn(Direction::Left));
        assert_eq!(st.snakes[&PlayerId(1)].dir, Direction::Right);

        Snake::handle_message(&mut st, &ctx, PlayerId(1), SnakeCommand::Turn(Direction::Up));
        Snake::handle_message(&mut st, &ctx, PlayerId(1), SnakeCommand::Turn(Direction::Left));
        assert_eq!(st.snakes[&PlayerId(1)].dir, Direction::Up, "left would still reverse the last step");

        tick(&mut st);
        Snake::handle_message(&mut st, &ctx, PlayerId(1), SnakeCommand::Turn(Direction::Left));
        assert_eq!(st.snakes[&PlayerId(1)].dir, Direction::Left);
    }

    #[test]
    fn test_join_spawns_and_welcomes_privately() {
        let mut st = board();
        let room = RoomName::new("arena");
        let ids = [PlayerId(1)];
        let ctx = RoomContext::new(&room, &ids);
        Snake::add_player(&mut st, &ctx, PlayerId(1));

        let snake = &st.snakes[&PlayerId(1)];
        assert_eq!(snake.len(), 1);
        assert!(snake.alive);
        assert_eq!(snake.dir, Direction::Right);
        assert_ne!(snake.head(), st.food);

        let fx = Snake::on_join(&mut st, &ctx, PlayerId(1));
        let (to, event) = &fx.messages[0];
        assert_eq!(*to, Recipient::Player(PlayerId(1)));
        let json: serde_json::Value =
            serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["player"], "P1");
        assert_eq!(json["w"], 20);
        assert_eq!(json["players"]["P1"]["dir"], "right");
        assert_eq!(json["players"]["P1"]["alive"], true);
    }

    #[test]
    fn test_leave_flushes_live_score() {
        let mut st = board();
        st.place(PlayerId(1), &[p(5, 5)], Direction::Right);
        st.snakes.get_mut(&PlayerId(1)).unwrap().score = 2;
        let room = RoomName::new("arena");
        let ctx = RoomContext::new(&room, &[]);

        let fx = Snake::on_leave(&mut st, &ctx, PlayerId(1));
        assert!(st.snakes.is_empty());
        assert_eq!(fx.outcomes, vec![Outcome::score(PlayerId(1), &room, 2)]);
        assert_eq!(fx.messages, vec![(Recipient::All, SnakeEvent::Leave { player: PlayerId(1) })]);
    }

    #[test]
    fn test_leave_after_death_records_nothing() {
        let mut st = board();
        st.place(PlayerId(1), &[p(19, 5)], Direction::Right);
        tick(&mut st);
        let room = RoomName::new("arena");
        let ctx = RoomContext::new(&room, &[]);
        let fx = Snake::on_leave(&mut st, &ctx, PlayerId(1));
        assert!(fx.outcomes.is_empty());
    }
}
