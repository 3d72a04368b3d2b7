//! Real-time tick source.
//!
//! The engine runs its game loop at 20 Hz. [`TickClock`] keeps the same
//! cadence on a tokio runtime so the plugin can run outside the engine,
//! in demos, integration tests and headless servers.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::TICKS_PER_SECOND;

/// Pacing of a [`TickClock`].
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Ticks per second, `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Late ticks that may still run back to back. Beyond that the clock
    /// drops them and restarts its cadence from now. 0 never catches up.
    pub max_catch_up: u32,
    /// Share of the tick period a tick may use before it is logged as slow.
    pub slow_tick_ratio: f64,
    /// Upper bound of a random delay before the first tick.
    pub start_jitter: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICKS_PER_SECOND,
            max_catch_up: 0,
            slow_tick_ratio: 0.8,
            start_jitter: Duration::ZERO,
        }
    }
}

impl ClockConfig {
    /// Highest accepted `tick_rate_hz`.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// Default settings at `tick_rate_hz`.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps the rate and the slow-tick ratio into range. A clamped rate
    /// is logged.
    pub fn validated(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            warn!(rate = self.tick_rate_hz, clamped = rate, "tick rate out of range");
            self.tick_rate_hz = rate;
        }
        self.slow_tick_ratio = self.slow_tick_ratio.clamp(0.0, 1.0);
        self
    }

    /// Length of one tick.
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

/// One tick handed out by [`TickClock::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1 for the first tick.
    pub number: u64,
    /// Woke up more than a tenth of a period after the deadline.
    pub late: bool,
    /// Ticks given up on before this one.
    pub dropped: u64,
}

/// Running counters kept by a [`TickClock`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Ticks handed out so far.
    pub ticks: u64,
    /// Ticks that woke up late.
    pub late_ticks: u64,
    /// Ticks given up on after a stall.
    pub dropped_ticks: u64,
    /// Longest time between `wait_for_tick` returning and `finish_tick`.
    pub slowest_tick: Duration,
    /// Time spent in the last tick over the period.
    pub last_load: f64,
}

/// Hands out ticks at a fixed rate on the tokio timer.
///
/// Call [`TickClock::wait_for_tick`], do the tick's work, then
/// [`TickClock::finish_tick`] so the load is measured.
pub struct TickClock {
    config: ClockConfig,
    period: Duration,
    ticks: u64,
    deadline: TokioInstant,
    work_started: Option<Instant>,
    metrics: TickMetrics,
}

impl TickClock {
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        let period = config.period();

        let mut deadline = TokioInstant::now() + period;
        let jitter_us = config.start_jitter.as_micros() as u64;
        if jitter_us > 0 {
            deadline += Duration::from_micros(rand::rng().random_range(0..jitter_us));
        }
        debug!(rate_hz = config.tick_rate_hz, max_catch_up = config.max_catch_up, "tick clock created");

        Self {
            config,
            period,
            ticks: 0,
            deadline,
            work_started: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel safe: nothing changes until the sleep has completed, so it
    /// can sit in a `tokio::select!` next to an event channel.
    pub async fn wait_for_tick(&mut self) -> Tick {
        time::sleep_until(self.deadline).await;

        let now = TokioInstant::now();
        let lag = now.saturating_duration_since(self.deadline);
        let late = lag > self.period / 10;
        let missed = (lag.as_nanos() / self.period.as_nanos().max(1)) as u64;
        let budget = u64::from(self.config.max_catch_up);

        let dropped = if missed <= budget {
            self.deadline += self.period;
            0
        } else {
            self.deadline = now + self.period;
            missed - budget
        };

        self.ticks += 1;
        self.work_started = Some(Instant::now());
        self.metrics.ticks += 1;
        self.metrics.dropped_ticks += dropped;
        if late {
            self.metrics.late_ticks += 1;
        }
        if dropped > 0 {
            warn!(tick = self.ticks, dropped, "can't keep up, dropping ticks");
        }
        trace!(tick = self.ticks, late, "tick");

        Tick {
            number: self.ticks,
            late,
            dropped,
        }
    }

    /// Marks the work for the current tick as done.
    pub fn finish_tick(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let took = started.elapsed();
        let load = took.as_secs_f64() / self.period.as_secs_f64();
        self.metrics.last_load = load;
        self.metrics.slowest_tick = self.metrics.slowest_tick.max(took);

        if load >= self.config.slow_tick_ratio {
            warn!(
                tick = self.ticks,
                took_ms = took.as_secs_f64() * 1000.0,
                load = format!("{:.0}%", load * 100.0),
                "slow tick"
            );
        }
    }

    /// Ticks handed out so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
