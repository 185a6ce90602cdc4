//! Rooms for Parlor.
//!
//! A [`Room`] owns one game's authoritative state and its members behind
//! a single guard. The [`RoomRegistry`] maps names to rooms and creates
//! them on first use. Tick-driven rooms additionally run a simulation
//! loop that calls [`Room::tick`] at a fixed interval.
//!
//! # Key types
//!
//! - [`RoomLogic`]: the trait game variants implement
//! - [`Effects`]: messages and outcomes a hook asks for
//! - [`Room`]: membership, fan-out, eviction
//! - [`RoomRegistry`]: race-free get-or-create by name
//! - [`OutcomeSink`]: where win/lose/score records go

mod config;
mod error;
mod logic;
mod outcome;
mod registry;
mod room;
mod simulation;

pub use config::RoomConfig;
pub use error::{RoomError, SinkError};
pub use logic::{Effects, RoomContext, RoomLogic};
pub use outcome::{
    LeaderboardQuery, LeaderboardRow, LogOutcomeSink, MemoryOutcomeSink,
    Outcome, OutcomeResult, OutcomeSink, RecordedOutcome,
};
pub use registry::RoomRegistry;
pub use room::{PlayerSender, Room};
