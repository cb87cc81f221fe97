//! Output pacing
//!
//! Pure timing arithmetic for the output tickers. The caller measures time
//! with a [`Clock`] and does the actual sleeping.

use std::time::Instant as StdInstant;

use embassy_time::{Duration, Instant};

/// Maps wall clock time onto [`Instant`]s counted from its creation
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: StdInstant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: StdInstant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        let elapsed = self.origin.elapsed();
        Instant::from_micros(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
    }
}

/// Convert to the duration type the standard library sleeps on
pub fn std_duration(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_micros(duration.as_micros())
}

/// Time between two writes of the same output
///
/// All outputs share the controller's command rate, so every output gets
/// one write per `outputs / frequency` seconds.
pub fn period_for(outputs: usize, frequency: u32) -> Duration {
    if frequency == 0 {
        return Duration::from_secs(1);
    }
    let outputs = outputs.max(1) as u64;
    Duration::from_micros(outputs * 1_000_000 / u64::from(frequency))
}

/// Command rate available to each output, in Hz
pub fn per_output_rate(frequency: u32, outputs: usize) -> f64 {
    if outputs == 0 {
        return f64::from(frequency);
    }
    f64::from(frequency) / outputs as f64
}

/// Result of a finished tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickResult {
    /// When the next tick should start
    pub next_deadline: Instant,
    /// How long to wait for it (zero when running late)
    pub sleep_duration: Duration,
}

/// Paces one ticker
///
/// ```ignore
/// let mut scheduler = TickScheduler::new();
/// loop {
///     scheduler.begin(clock.now());
///     write_output();
///     let result = scheduler.finish(clock.now(), period);
///     sleep(result.sleep_duration);
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    started: Instant,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub const fn new() -> Self {
        Self {
            started: Instant::from_ticks(0),
        }
    }

    /// Mark the start of a tick
    pub fn begin(&mut self, now: Instant) {
        self.started = now;
    }

    /// Work out the wait until the next tick
    ///
    /// The period is sampled per tick so a changed output count takes
    /// effect on the next cycle. Time spent in the tick is subtracted.
    pub fn finish(&self, now: Instant, period: Duration) -> TickResult {
        let next_deadline = self.started + period;
        let sleep_duration = if next_deadline > now {
            next_deadline - now
        } else {
            Duration::from_ticks(0)
        };
        TickResult {
            next_deadline,
            sleep_duration,
        }
    }
}
