//! Core protocol types shared by rooms, games, and clients.
//!
//! Think of this as the vocabulary of the wire format: who a player is,
//! which room they are in, who should receive a message, and the grid
//! geometry the snake game talks in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identity within one room.
///
/// Ids are handed out by the room as `P1`, `P2`, ... from a per-room
/// counter that never goes backwards, so an id is never reused inside a
/// room even after its owner leaves. The same id can exist in two
/// different rooms; an id only means something next to its [`RoomName`].
///
/// On the wire (and as a JSON map key) a `PlayerId(3)` is the string
/// `"P3"`, which is what clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('P')
            .and_then(|n| n.parse().ok())
            .map(PlayerId)
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("bad player id: {s:?}"))
            })
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The name of a room, taken from the URL the client connected to.
///
/// Names are immutable once a room exists; the registry uses them as
/// the map key, so two clients asking for `"r1"` land in the same room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a plain string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoomName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server message.
///
/// Game logic returns `(Recipient, ServerMessage)` pairs; the room
/// resolves each recipient against its current membership at dispatch
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Send to every player in the room.
    All,

    /// Send to one specific player (private reply).
    Player(PlayerId),

    /// Send to everyone EXCEPT the specified player.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` should receive a message addressed here.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => *target == player,
            Self::AllExcept(excluded) => *excluded != player,
        }
    }
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// An integer grid coordinate. Equality is plain value equality.
///
/// Signed on purpose: a head stepping off the left or top edge produces
/// `-1`, which is how wall collisions are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The neighbouring cell one step in `dir`. `y` grows downwards.
    pub fn step(self, dir: Direction) -> Self {
        match dir {
            Direction::Up => Self { x: self.x, y: self.y - 1 },
            Direction::Down => Self { x: self.x, y: self.y + 1 },
            Direction::Left => Self { x: self.x - 1, y: self.y },
            Direction::Right => Self { x: self.x + 1, y: self.y },
        }
    }

    /// Returns `true` if the point lies on a `width × height` board.
    pub fn within(self, width: i32, height: i32) -> bool {
        (0..width).contains(&self.x) && (0..height).contains(&self.y)
    }
}

/// A heading on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The 180° reverse of this heading.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// The lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown direction: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_player_id_display_and_parse() {
        assert_eq!(PlayerId(7).to_string(), "P7");
        assert_eq!("P7".parse::<PlayerId>().unwrap(), PlayerId(7));
        assert!("7".parse::<PlayerId>().is_err());
        assert!("Px".parse::<PlayerId>().is_err());
    }

    #[test]
    fn test_player_id_serializes_as_string_map_key() {
        let mut map = BTreeMap::new();
        map.insert(PlayerId(2), 1);
        map.insert(PlayerId(1), 0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"P1":0,"P2":1}"#);
    }

    #[test]
    fn test_room_name_transparent() {
        let name = RoomName::new("r1");
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""r1""#);
        assert_eq!(name.to_string(), "r1");
    }

    #[test]
    fn test_recipient_includes() {
        let (a, b) = (PlayerId(1), PlayerId(2));
        assert!(Recipient::All.includes(a));
        assert!(Recipient::Player(a).includes(a));
        assert!(!Recipient::Player(a).includes(b));
        assert!(!Recipient::AllExcept(a).includes(a));
        assert!(Recipient::AllExcept(a).includes(b));
    }

    #[test]
    fn test_point_step_and_bounds() {
        let origin = Point { x: 0, y: 0 };
        assert_eq!(origin.step(Direction::Right), Point { x: 1, y: 0 });
        assert_eq!(origin.step(Direction::Down), Point { x: 0, y: 1 });
        assert!(!origin.step(Direction::Up).within(20, 20));
        assert!(!origin.step(Direction::Left).within(20, 20));
        assert!(!Point { x: 20, y: 5 }.within(20, 20));
        assert!(Point { x: 19, y: 19 }.within(20, 20));
    }

    #[test]
    fn test_direction_opposites_and_names() {
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.as_str().parse::<Direction>().unwrap(), dir);
        }
        assert!("north".parse::<Direction>().is_err());
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), r#""up""#);
    }
}
