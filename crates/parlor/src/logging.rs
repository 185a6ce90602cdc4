//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at the default level.
const CRATES: [&str; 6] = [
    "parlor",
    "parlor_transport",
    "parlor_room",
    "parlor_tick",
    "parlor_games",
    "game_server",
];

/// Installs a `tracing` subscriber that prints to stdout.
///
/// Every Parlor crate logs at `default_level` (`"info"`, `"debug"`, ...);
/// other crates stay at their own defaults. Setting `RUST_LOG` replaces
/// the whole filter. Calling this more than once is harmless: the first
/// subscriber wins.
pub fn init(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATES
            .iter()
            .map(|krate| format!("{krate}={default_level}"))
            .collect::<Vec<_>>()
            .join(",")
            .into()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
