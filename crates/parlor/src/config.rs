//! Server settings and request-path routing.

use std::time::Duration;

use parlor_protocol::RoomName;

/// Path prefix that selects a room: `/ws/<room>`.
const ROOM_PREFIX: &str = "/ws/";

/// Settings for a [`ParlorServer`](crate::ParlorServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Room for clients that connect to `/` or `/ws`.
    pub default_room: RoomName,
    /// Upper bound on a single outbound write. A client that cannot take
    /// a frame within this window is disconnected.
    pub send_timeout: Duration,
    /// Disconnect a client that sends nothing for this long. `None`
    /// waits forever.
    pub idle_timeout: Option<Duration>,
    /// How long a new TCP client has to complete the WebSocket upgrade.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            default_room: RoomName::new("lobby"),
            send_timeout: Duration::from_secs(5),
            idle_timeout: None,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Maps a request path to the room it names.
    ///
    /// `/ws/<room>` selects `<room>` (a trailing slash is ignored). Any
    /// other path, or a missing or empty room segment, selects
    /// [`default_room`](Self::default_room).
    pub fn room_for_path(&self, path: Option<&str>) -> RoomName {
        path.and_then(|p| p.strip_prefix(ROOM_PREFIX))
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|name| !name.is_empty())
            .map(RoomName::new)
            .unwrap_or_else(|| self.default_room.clone())
    }
}
