//! The simulation loop of a tick-driven room.

use std::sync::Weak;
use std::time::Duration;

use parlor_tick::{TickConfig, TickScheduler};
use tokio::sync::watch;

use crate::{Room, RoomLogic};

/// Spawns the loop. It ends when the stop signal flips, the stop sender
/// is dropped, or the room itself is gone.
pub(crate) fn spawn<G: RoomLogic>(
    room: Weak<Room<G>>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut scheduler = TickScheduler::new(TickConfig::every(interval));

    tokio::spawn(async move {
        let name = match room.upgrade() {
            Some(room) => room.name().clone(),
            None => return,
        };
        tracing::info!(room = %name, ?interval, "simulation loop started");

        loop {
            if *stop.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                tick = scheduler.wait_for_tick() => {
                    let Some(room) = room.upgrade() else { break };
                    room.tick(tick.dt).await;
                    scheduler.record_tick_end();
                }
            }
        }

        let metrics = scheduler.metrics();
        tracing::info!(
            room = %name,
            ticks = metrics.ticks,
            overruns = metrics.overruns,
            skipped = metrics.skipped,
            "simulation loop stopped"
        );
    });
}
