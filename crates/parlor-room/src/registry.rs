//! Room registry: maps room names to rooms, creating them on first use.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_protocol::RoomName;
use tokio::sync::RwLock;

use crate::{LogOutcomeSink, OutcomeSink, Room, RoomLogic};

/// All rooms of one game variant, keyed by name.
///
/// Rooms are created lazily and live for as long as the registry does.
/// Shared by every session task behind an `Arc`.
pub struct RoomRegistry<G: RoomLogic> {
    rooms: RwLock<HashMap<RoomName, Arc<Room<G>>>>,
    game_config: G::Config,
    sink: Arc<dyn OutcomeSink>,
}

impl<G: RoomLogic> RoomRegistry<G> {
    /// Creates an empty registry whose rooms only log their outcomes.
    pub fn new(game_config: G::Config) -> Self {
        Self::with_sink(game_config, Arc::new(LogOutcomeSink))
    }

    /// Creates an empty registry whose rooms record outcomes to `sink`.
    pub fn with_sink(game_config: G::Config, sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            game_config,
            sink,
        }
    }

    /// Returns the room called `name`, creating it if needed.
    ///
    /// Concurrent first calls for the same name all get the same room:
    /// a miss under the read lock is re-checked under the write lock
    /// before anything is created. A tick-driven room's simulation loop
    /// is started while the write lock is still held.
    pub async fn get_or_create(&self, name: &RoomName) -> Arc<Room<G>> {
        if let Some(room) = self.rooms.read().await.get(name) {
            return Arc::clone(room);
        }

        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(name) {
            return Arc::clone(room);
        }

        let room = Arc::new(Room::new(
            name.clone(),
            &self.game_config,
            Arc::clone(&self.sink),
        ));
        rooms.insert(name.clone(), Arc::clone(&room));
        let simulating = room.start_simulation();
        tracing::info!(room = %name, simulating, "room created");
        room
    }

    /// Returns the room called `name` if it exists.
    pub async fn get(&self, name: &RoomName) -> Option<Arc<Room<G>>> {
        self.rooms.read().await.get(name).cloned()
    }

    /// Number of rooms created so far.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Names of all rooms, sorted.
    pub async fn room_names(&self) -> Vec<RoomName> {
        let mut names: Vec<_> = self.rooms.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops every room. Rooms stay registered but their simulation
    /// loops exit and they admit no new members.
    pub async fn shutdown(&self) {
        let rooms = self.rooms.read().await;
        for room in rooms.values() {
            room.stop();
        }
        tracing::info!(rooms = rooms.len(), "room registry shut down");
    }
}
