//! Fixed-interval clock for simulation rooms.
//!
//! A [`TickScheduler`] fires once per `interval` of Tokio time (the snake
//! room uses 200 ms). A tick that fires more than a tenth of an interval
//! late is an overrun. Whole intervals missed while the room was stalled
//! are skipped rather than replayed, and the cadence restarts from the
//! late tick. The first tick gets a small random delay so rooms created
//! at the same instant do not all step in lockstep.
//!
//! Without an interval the scheduler never fires, so a `select!` around
//! [`TickScheduler::wait_for_tick`] reduces to its other branches:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop.changed() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             room.tick(tick.dt).await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Settings for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `None` never ticks.
    pub interval: Option<Duration>,
    /// Fraction of the interval one update step may take before a
    /// warning is logged, in `0.0..=1.0`.
    pub step_budget: f64,
    /// Upper bound of the random delay added to the first tick.
    pub first_tick_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: None,
            step_budget: 0.8,
            first_tick_jitter: Duration::from_millis(2),
        }
    }
}

impl TickConfig {
    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(5);

    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::default()
        }
    }

    /// Same config with a deterministic first tick.
    pub fn without_jitter(mut self) -> Self {
        self.first_tick_jitter = Duration::ZERO;
        self
    }

    /// Brings out-of-range values back into range. Applied by
    /// [`TickScheduler::new`].
    pub fn normalized(mut self) -> Self {
        if let Some(interval) = self.interval.filter(|i| *i < Self::MIN_INTERVAL) {
            warn!(?interval, min = ?Self::MIN_INTERVAL, "tick interval too short, raising");
            self.interval = Some(Self::MIN_INTERVAL);
        }
        self.step_budget = if self.step_budget.is_nan() {
            1.0
        } else {
            self.step_budget.clamp(0.0, 1.0)
        };
        self
    }
}

/// One fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Starts at 1.
    pub number: u64,
    /// Simulated time covered by this tick: always the interval, however
    /// late the tick fired.
    pub dt: Duration,
    /// How far past its deadline the tick fired.
    pub late_by: Duration,
    /// Whole intervals that were missed and will not be replayed.
    pub skipped: u64,
}

impl Tick {
    pub fn is_overrun(&self) -> bool {
        self.late_by > self.dt / 10
    }
}

/// Counters kept by a scheduler over its lifetime.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub ticks: u64,
    pub overruns: u64,
    pub skipped: u64,
    /// Moving average of update-step time, each step weighted 1/10.
    pub mean_step: Duration,
    pub longest_step: Duration,
}

/// Fixed-interval tick source. One per simulation loop.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    deadline: Option<Instant>,
    fired: u64,
    /// Wall-clock start of the step for the last tick, until
    /// [`record_tick_end`](Self::record_tick_end) consumes it.
    step_started: Option<std::time::Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// The first tick is due one interval (plus jitter) from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.normalized();
        let deadline = config
            .interval
            .map(|interval| Instant::now() + interval + first_tick_delay(config.first_tick_jitter));
        debug!(interval = ?config.interval, "tick scheduler ready");

        Self {
            config,
            deadline,
            fired: 0,
            step_started: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Sleeps until the next tick is due and returns it.
    ///
    /// Pends forever when no interval is configured.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let (Some(deadline), Some(interval)) = (self.deadline, self.config.interval) else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;

        let now = Instant::now();
        self.fired += 1;
        self.step_started = Some(std::time::Instant::now());
        self.deadline = Some(now + interval);

        let late_by = now.saturating_duration_since(deadline);
        let tick = Tick {
            number: self.fired,
            dt: interval,
            late_by,
            skipped: (late_by.as_nanos() / interval.as_nanos()) as u64,
        };

        self.metrics.ticks += 1;
        self.metrics.skipped += tick.skipped;
        if tick.is_overrun() {
            self.metrics.overruns += 1;
            if tick.skipped > 0 {
                warn!(tick = tick.number, ?late_by, skipped = tick.skipped, "tick overrun, skipping ahead");
            } else {
                debug!(tick = tick.number, ?late_by, "tick fired late");
            }
        }
        trace!(tick = tick.number, "tick");
        tick
    }

    /// Marks the end of the update step for the last tick and returns
    /// how long it took. `None` if there was no unfinished step.
    pub fn record_tick_end(&mut self) -> Option<Duration> {
        let step = self.step_started.take()?.elapsed();

        if let Some(interval) = self.config.interval {
            if step.as_secs_f64() >= interval.as_secs_f64() * self.config.step_budget {
                warn!(tick = self.fired, ?step, ?interval, "update step close to the tick interval");
            }
        }

        let m = &mut self.metrics;
        m.longest_step = m.longest_step.max(step);
        m.mean_step = if m.ticks <= 1 {
            step
        } else {
            m.mean_step.mul_f64(0.9) + step.mul_f64(0.1)
        };
        Some(step)
    }

    pub fn is_event_driven(&self) -> bool {
        self.config.interval.is_none()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.config.interval
    }

    /// Ticks fired so far.
    pub fn ticks_fired(&self) -> u64 {
        self.fired
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}

fn first_tick_delay(max: Duration) -> Duration {
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..max_us))
}
