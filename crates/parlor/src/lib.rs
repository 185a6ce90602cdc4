//! # Parlor
//!
//! Multi-room real-time session server.
//!
//! Clients connect over WebSocket to `/ws/<room>` and are placed in that
//! room, which is created on first use. A game variant implements the
//! [`RoomLogic`](parlor_room::RoomLogic) trait; the server handles
//! connections, routing, fan-out, slow-client eviction and the per-room
//! simulation loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parlor::prelude::*;
//! use parlor_games::Chat;
//!
//! # async fn start() -> Result<(), ParlorError> {
//! parlor::logging::init("info");
//! let server = ParlorServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build::<Chat>(())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use config::ServerConfig;
pub use error::ParlorError;
pub use server::{ParlorServer, ParlorServerBuilder};

/// Everything needed to write a game variant and serve it.
pub mod prelude {
    pub use crate::{ParlorError, ParlorServer, ParlorServerBuilder, ServerConfig};
    pub use parlor_protocol::{Frame, PlayerId, Recipient, RoomName, WireMessage};
    pub use parlor_room::{
        Effects, MemoryOutcomeSink, Outcome, OutcomeResult, OutcomeSink, Room,
        RoomConfig, RoomContext, RoomLogic, RoomRegistry,
    };
    pub use parlor_transport::Connection;
}
