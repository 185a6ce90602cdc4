//! The `RoomLogic` trait: the extension point for game variants.
//!
//! A variant supplies only its state shape and its reactions to events.
//! Membership, the guard, fan-out, eviction and outcome recording are
//! handled by [`Room`](crate::Room), so every hook here is a plain
//! synchronous function that runs while the room's guard is held.

use std::time::Duration;

use parlor_protocol::{PlayerId, Recipient, RoomName, WireMessage};

use crate::{Outcome, RoomConfig};

/// Read-only view of the room handed to every hook.
#[derive(Debug, Clone, Copy)]
pub struct RoomContext<'a> {
    room: &'a RoomName,
    members: &'a [PlayerId],
}

impl<'a> RoomContext<'a> {
    /// Builds a context. `members` must be sorted ascending.
    pub fn new(room: &'a RoomName, members: &'a [PlayerId]) -> Self {
        Self { room, members }
    }

    /// The room's name.
    pub fn room(&self) -> &'a RoomName {
        self.room
    }

    /// Current member ids, in ascending order.
    pub fn members(&self) -> &'a [PlayerId] {
        self.members
    }

    /// Number of current members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if `player` is currently a member.
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.binary_search(&player).is_ok()
    }
}

/// What a hook wants to happen once it returns: messages to deliver, in
/// order, and outcomes to hand to the outcome sink.
#[derive(Debug, Clone)]
pub struct Effects<M> {
    pub messages: Vec<(Recipient, M)>,
    pub outcomes: Vec<Outcome>,
}

impl<M> Default for Effects<M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            outcomes: Vec::new(),
        }
    }
}

impl<M> Effects<M> {
    /// No messages, no outcomes.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single message to every member.
    pub fn broadcast(msg: M) -> Self {
        let mut fx = Self::none();
        fx.send(Recipient::All, msg);
        fx
    }

    /// A single private message.
    pub fn reply(player: PlayerId, msg: M) -> Self {
        let mut fx = Self::none();
        fx.send(Recipient::Player(player), msg);
        fx
    }

    /// Queues `msg` for `to`.
    pub fn send(&mut self, to: Recipient, msg: M) -> &mut Self {
        self.messages.push((to, msg));
        self
    }

    /// Queues an outcome record.
    pub fn record(&mut self, outcome: Outcome) -> &mut Self {
        self.outcomes.push(outcome);
        self
    }

    /// Appends everything from `other`, keeping order.
    pub fn extend(&mut self, other: Effects<M>) {
        self.messages.extend(other.messages);
        self.outcomes.extend(other.outcomes);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.outcomes.is_empty()
    }
}

/// The capability set every game variant implements.
///
/// The room calls these hooks at the right time:
///
/// - `init` once, when the registry creates the room
/// - `add_player` inside `join`, `on_join` when the session greets
/// - `parse_message` and `handle_message` for each inbound frame
/// - `on_leave` when a member leaves or is evicted
/// - `tick` on every simulation step (tick-driven rooms only)
pub trait RoomLogic: Send + Sync + 'static {
    /// Variant settings (secret range, board size, ...).
    type Config: Send + Sync + Clone + Default + 'static;

    /// The room's authoritative shared state.
    type State: Send + 'static;

    /// A parsed inbound message.
    type ClientMessage: Send;

    /// An outbound message.
    type ServerMessage: WireMessage;

    /// Room settings for this variant. Default: event-driven.
    fn room_config() -> RoomConfig {
        RoomConfig::default()
    }

    /// Creates the state of a fresh room.
    fn init(config: &Self::Config, room: &RoomName) -> Self::State;

    /// Parses one inbound text frame.
    ///
    /// `Err` carries the reply sent privately to the sender; the state is
    /// not touched.
    fn parse_message(
        text: &str,
    ) -> Result<Self::ClientMessage, Self::ServerMessage>;

    /// Sets up per-player state for a new member. `ctx` already lists
    /// `player`. Default: no-op.
    fn add_player(
        _state: &mut Self::State,
        _ctx: &RoomContext<'_>,
        _player: PlayerId,
    ) {
    }

    /// Announces a new member. Default: nothing.
    fn on_join(
        _state: &mut Self::State,
        _ctx: &RoomContext<'_>,
        _player: PlayerId,
    ) -> Effects<Self::ServerMessage> {
        Effects::none()
    }

    /// Applies one parsed message from `sender`.
    fn handle_message(
        state: &mut Self::State,
        ctx: &RoomContext<'_>,
        sender: PlayerId,
        msg: Self::ClientMessage,
    ) -> Effects<Self::ServerMessage>;

    /// Cleans up after a departed member. `ctx` no longer lists
    /// `player`. Default: nothing.
    fn on_leave(
        _state: &mut Self::State,
        _ctx: &RoomContext<'_>,
        _player: PlayerId,
    ) -> Effects<Self::ServerMessage> {
        Effects::none()
    }

    /// Runs one simulation step. Default: nothing.
    fn tick(
        _state: &mut Self::State,
        _ctx: &RoomContext<'_>,
        _dt: Duration,
    ) -> Effects<Self::ServerMessage> {
        Effects::none()
    }
}
