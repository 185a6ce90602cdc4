//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-room settings.
///
/// Game variants override these defaults through
/// [`RoomLogic::room_config`](crate::RoomLogic::room_config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Interval of the simulation loop. `None` means the room is
    /// event-driven and never ticks.
    pub tick_interval: Option<Duration>,

    /// Capacity of each member's outbound queue, in frames.
    pub outbound_capacity: usize,

    /// How many consecutive sends may find a member's queue full before
    /// that member is evicted.
    pub max_stalled_sends: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_interval: None,
            outbound_capacity: 64,
            max_stalled_sends: 8,
        }
    }
}

impl RoomConfig {
    /// Config for a tick-driven room with default delivery settings.
    pub fn ticking(interval: Duration) -> Self {
        Self {
            tick_interval: Some(interval),
            ..Default::default()
        }
    }

    /// Returns `true` if rooms with this config run a simulation loop.
    pub fn is_tick_driven(&self) -> bool {
        self.tick_interval.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.tick_interval, None);
        assert_eq!(config.outbound_capacity, 64);
        assert_eq!(config.max_stalled_sends, 8);
        assert!(!config.is_tick_driven());
    }

    #[test]
    fn test_room_config_ticking() {
        let config = RoomConfig::ticking(Duration::from_millis(200));
        assert_eq!(config.tick_interval, Some(Duration::from_millis(200)));
        assert!(config.is_tick_driven());
    }
}
