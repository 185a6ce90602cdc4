//! A room: one game's authoritative state, its members, and the guard
//! that linearizes every change to them.
//!
//! Every operation takes the guard, runs one [`RoomLogic`] hook, and
//! dispatches the resulting messages before releasing it, so no other
//! task ever observes a half-applied event. Dispatch never blocks:
//! each member owns a bounded outbound queue and frames are `try_send`
//! into it. A member whose queue is gone, or full for too long, is
//! evicted on the spot and the rest of the room still gets the frame.
//! Outcome records are written after the guard is released.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::{Frame, PlayerId, Recipient, RoomName, WireMessage};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};

use crate::simulation;
use crate::{Effects, Outcome, OutcomeSink, RoomConfig, RoomContext, RoomError, RoomLogic};

/// Sending half of a member's outbound queue.
pub type PlayerSender = mpsc::Sender<Frame>;

struct Member {
    sender: PlayerSender,
    /// Consecutive sends that found the queue full.
    stalled: u32,
}

/// Everything behind the guard.
struct RoomInner<G: RoomLogic> {
    state: G::State,
    members: BTreeMap<PlayerId, Member>,
    /// Last assigned ordinal. Ids are never reused within a room.
    last_id: u64,
}

impl<G: RoomLogic> RoomInner<G> {
    fn member_ids(&self) -> Vec<PlayerId> {
        self.members.keys().copied().collect()
    }
}

/// A named room running game variant `G`.
pub struct Room<G: RoomLogic> {
    name: RoomName,
    config: RoomConfig,
    inner: Mutex<RoomInner<G>>,
    sink: Arc<dyn OutcomeSink>,
    simulation_started: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl<G: RoomLogic> Room<G> {
    /// Creates a room with fresh state. Does not start the simulation
    /// loop; see [`Room::start_simulation`].
    pub fn new(
        name: RoomName,
        game_config: &G::Config,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        let state = G::init(game_config, &name);
        let (stop_tx, _) = watch::channel(false);
        Self {
            name,
            config: G::room_config(),
            inner: Mutex::new(RoomInner {
                state,
                members: BTreeMap::new(),
                last_id: 0,
            }),
            sink,
            simulation_started: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// The room's name.
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// The room's settings.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Admits a new member whose frames go to `sender` and returns its id.
    ///
    /// Nobody is notified; call [`Room::greet`] once the member is ready
    /// to receive.
    pub async fn join(&self, sender: PlayerSender) -> Result<PlayerId, RoomError> {
        let mut inner = self.inner.lock().await;
        // Checked under the guard so a concurrent stop cannot slip in
        // between the check and the insert.
        if self.is_stopped() {
            return Err(RoomError::Stopped(self.name.clone()));
        }
        inner.last_id += 1;
        let player = PlayerId(inner.last_id);
        inner.members.insert(player, Member { sender, stalled: 0 });

        let ids = inner.member_ids();
        let ctx = RoomContext::new(&self.name, &ids);
        G::add_player(&mut inner.state, &ctx, player);

        tracing::info!(
            room = %self.name,
            %player,
            members = ids.len(),
            "player joined"
        );
        Ok(player)
    }

    /// Runs the variant's join hook for `player`.
    pub async fn greet(&self, player: PlayerId) -> Result<(), RoomError> {
        let outcomes = {
            let mut inner = self.inner.lock().await;
            self.ensure_member(&inner, player)?;
            let ids = inner.member_ids();
            let ctx = RoomContext::new(&self.name, &ids);
            let fx = G::on_join(&mut inner.state, &ctx, player);
            self.dispatch(&mut inner, fx)
        };
        self.record_all(outcomes).await;
        Ok(())
    }

    /// Removes `player`, dropping its outbound queue, and runs the
    /// variant's leave hook.
    ///
    /// Returns `false` if `player` was not a member; a second call for
    /// the same player is a no-op.
    pub async fn leave(&self, player: PlayerId) -> bool {
        let outcomes = {
            let mut inner = self.inner.lock().await;
            if inner.members.remove(&player).is_none() {
                return false;
            }
            tracing::info!(
                room = %self.name,
                %player,
                members = inner.members.len(),
                "player left"
            );
            let ids = inner.member_ids();
            let ctx = RoomContext::new(&self.name, &ids);
            let fx = G::on_leave(&mut inner.state, &ctx, player);
            self.dispatch(&mut inner, fx)
        };
        self.record_all(outcomes).await;
        true
    }

    /// Parses and applies one inbound text frame from `player`.
    ///
    /// Malformed input gets the variant's private reply and leaves the
    /// state untouched.
    pub async fn handle_text(
        &self,
        player: PlayerId,
        text: &str,
    ) -> Result<(), RoomError> {
        let outcomes = {
            let mut inner = self.inner.lock().await;
            self.ensure_member(&inner, player)?;
            let fx = match G::parse_message(text) {
                Ok(msg) => {
                    let ids = inner.member_ids();
                    let ctx = RoomContext::new(&self.name, &ids);
                    G::handle_message(&mut inner.state, &ctx, player, msg)
                }
                Err(reply) => {
                    tracing::debug!(
                        room = %self.name,
                        %player,
                        "rejected malformed input"
                    );
                    Effects::reply(player, reply)
                }
            };
            self.dispatch(&mut inner, fx)
        };
        self.record_all(outcomes).await;
        Ok(())
    }

    /// Runs one simulation step and delivers its snapshot.
    pub async fn tick(&self, dt: Duration) {
        let outcomes = {
            let mut inner = self.inner.lock().await;
            let ids = inner.member_ids();
            let ctx = RoomContext::new(&self.name, &ids);
            let fx = G::tick(&mut inner.state, &ctx, dt);
            self.dispatch(&mut inner, fx)
        };
        self.record_all(outcomes).await;
    }

    /// Sends `msg` to every current member.
    pub async fn broadcast(&self, msg: G::ServerMessage) {
        let outcomes = {
            let mut inner = self.inner.lock().await;
            self.dispatch(&mut inner, Effects::broadcast(msg))
        };
        self.record_all(outcomes).await;
    }

    /// Runs `f` against the state under the guard.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut G::State) -> R) -> R {
        let mut inner = self.inner.lock().await;
        f(&mut inner.state)
    }

    /// Current member ids, ascending.
    pub async fn member_ids(&self) -> Vec<PlayerId> {
        self.inner.lock().await.member_ids()
    }

    pub async fn member_count(&self) -> usize {
        self.inner.lock().await.members.len()
    }

    /// Starts the simulation loop if this room is tick-driven and no loop
    /// has been started yet. Returns `true` if this call started it.
    pub fn start_simulation(self: &Arc<Self>) -> bool {
        let Some(interval) = self.config.tick_interval else {
            return false;
        };
        if self.is_stopped() || self.simulation_started.swap(true, Ordering::AcqRel) {
            return false;
        }
        simulation::spawn(Arc::downgrade(self), interval, self.stop_tx.subscribe());
        true
    }

    /// Whether a simulation loop was ever started for this room.
    pub fn is_simulating(&self) -> bool {
        self.simulation_started.load(Ordering::Acquire)
    }

    /// Stops the simulation loop and closes the room to new members.
    /// Current members stay until they leave.
    pub fn stop(&self) {
        if !self.stop_tx.send_replace(true) {
            tracing::info!(room = %self.name, "room stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    fn ensure_member(
        &self,
        inner: &RoomInner<G>,
        player: PlayerId,
    ) -> Result<(), RoomError> {
        if inner.members.contains_key(&player) {
            Ok(())
        } else {
            Err(RoomError::NotInRoom(player, self.name.clone()))
        }
    }

    /// Delivers `fx`, evicting members whose queues fail, and running
    /// the leave hook for each evicted member until nothing else fails.
    /// Returns every outcome produced along the way.
    fn dispatch(
        &self,
        inner: &mut RoomInner<G>,
        fx: Effects<G::ServerMessage>,
    ) -> Vec<Outcome> {
        let mut outcomes = fx.outcomes;
        let mut pending = fx.messages;

        loop {
            let evicted = self.deliver(inner, pending);
            if evicted.is_empty() {
                return outcomes;
            }
            pending = Vec::new();
            for player in evicted {
                let ids = inner.member_ids();
                let ctx = RoomContext::new(&self.name, &ids);
                let fx = G::on_leave(&mut inner.state, &ctx, player);
                pending.extend(fx.messages);
                outcomes.extend(fx.outcomes);
            }
        }
    }

    /// One delivery pass. Returns the members evicted during it, already
    /// removed from the membership.
    fn deliver(
        &self,
        inner: &mut RoomInner<G>,
        messages: Vec<(Recipient, G::ServerMessage)>,
    ) -> Vec<PlayerId> {
        let mut evicted = Vec::new();

        for (recipient, msg) in messages {
            let frame = match msg.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(room = %self.name, error = %e, "failed to encode message");
                    continue;
                }
            };

            for (&player, member) in inner.members.iter_mut() {
                if !recipient.includes(player) || evicted.contains(&player) {
                    continue;
                }
                match member.sender.try_send(Frame::clone(&frame)) {
                    Ok(()) => member.stalled = 0,
                    Err(TrySendError::Closed(_)) => {
                        tracing::warn!(room = %self.name, %player, "outbound queue closed, evicting");
                        evicted.push(player);
                    }
                    Err(TrySendError::Full(_)) => {
                        member.stalled += 1;
                        if member.stalled > self.config.max_stalled_sends {
                            tracing::warn!(
                                room = %self.name,
                                %player,
                                stalled = member.stalled,
                                "outbound queue persistently full, evicting"
                            );
                            evicted.push(player);
                        } else {
                            tracing::debug!(
                                room = %self.name,
                                %player,
                                stalled = member.stalled,
                                "outbound queue full, frame dropped"
                            );
                        }
                    }
                }
            }
        }

        for player in &evicted {
            inner.members.remove(player);
        }
        evicted
    }

    async fn record_all(&self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            if let Err(e) = self.sink.record(&outcome).await {
                tracing::warn!(
                    room = %self.name,
                    player = %outcome.player,
                    error = %e,
                    "failed to record outcome"
                );
            }
        }
    }
}

impl<G: RoomLogic> std::fmt::Debug for Room<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogOutcomeSink;

    /// Echo game: every message is broadcast; "fail" is rejected.
    struct Echo;

    impl RoomLogic for Echo {
        type Config = ();
        type State = Vec<PlayerId>;
        type ClientMessage = String;
        type ServerMessage = String;

        fn init(_config: &(), _room: &RoomName) -> Self::State {
            Vec::new()
        }

        fn parse_message(text: &str) -> Result<String, String> {
            if text == "fail" {
                Err("bad input".to_string())
            } else {
                Ok(text.to_string())
            }
        }

        fn add_player(state: &mut Self::State, _ctx: &RoomContext<'_>, player: PlayerId) {
            state.push(player);
        }

        fn handle_message(
            _state: &mut Self::State,
            _ctx: &RoomContext<'_>,
            _sender: PlayerId,
            msg: String,
        ) -> Effects<String> {
            Effects::broadcast(msg)
        }

        fn on_leave(
            state: &mut Self::State,
            _ctx: &RoomContext<'_>,
            player: PlayerId,
        ) -> Effects<String> {
            state.retain(|p| *p != player);
            Effects::broadcast(format!("{player} left"))
        }
    }

    fn room() -> Room<Echo> {
        Room::new(RoomName::new("r1"), &(), Arc::new(LogOutcomeSink))
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let room = room();
        let (tx, _rx) = mpsc::channel(4);
        assert_eq!(room.join(tx.clone()).await.unwrap(), PlayerId(1));
        assert_eq!(room.join(tx).await.unwrap(), PlayerId(2));
        assert_eq!(room.member_ids().await, vec![PlayerId(1), PlayerId(2)]);
        assert_eq!(room.with_state(|s| s.clone()).await, vec![PlayerId(1), PlayerId(2)]);
    }

    #[tokio::test]
    async fn test_malformed_input_is_private() {
        let room = room();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let p1 = room.join(tx1).await.unwrap();
        room.join(tx2).await.unwrap();

        room.handle_text(p1, "fail").await.unwrap();
        assert_eq!(&*rx1.recv().await.unwrap(), "bad input");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_non_member_is_rejected() {
        let room = room();
        let err = room.handle_text(PlayerId(9), "hi").await.unwrap_err();
        assert!(matches!(err, RoomError::NotInRoom(PlayerId(9), _)));
        assert!(room.greet(PlayerId(9)).await.is_err());
    }

    #[tokio::test]
    async fn test_eviction_runs_leave_hook() {
        let room = room();
        let (tx1, rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let p1 = room.join(tx1).await.unwrap();
        let p2 = room.join(tx2).await.unwrap();
        drop(rx1);

        room.broadcast("hello".to_string()).await;

        assert_eq!(room.member_ids().await, vec![p2]);
        assert_eq!(room.with_state(|s| s.clone()).await, vec![p2]);
        assert_eq!(&*rx2.recv().await.unwrap(), "hello");
        assert_eq!(&*rx2.recv().await.unwrap(), format!("{p1} left"));
        assert!(!room.leave(p1).await, "already evicted");
    }

    #[tokio::test]
    async fn test_stop_closes_room_to_joins() {
        let room = room();
        room.stop();
        assert!(room.is_stopped());
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(room.join(tx).await, Err(RoomError::Stopped(_))));
    }
}
