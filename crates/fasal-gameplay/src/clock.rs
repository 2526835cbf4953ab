//! Time sources and the tick driver.
//!
//! The engine never reads wall-clock time directly. Every timestamp comes from
//! a [`Clock`], and crop ageing is computed from stored timestamps, so a single
//! catch-up tick produces the same state as many small ones.
//!
//! - [`SystemClock`]: real UTC time
//! - [`ScaledClock`]: simulated time running faster than real time
//! - [`ManualClock`]: explicitly advanced time for tests and scripts
//! - [`TickDriver`]: decides when the next periodic tick is due

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Milliseconds in a simulated minute.
const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Source of the current simulated time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real UTC wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Simulated time that advances `scale` simulated seconds per real second.
#[derive(Debug)]
pub struct ScaledClock {
    origin: DateTime<Utc>,
    started: Instant,
    scale: f64,
}

impl ScaledClock {
    /// Creates a scaled clock starting at `origin`.
    ///
    /// A scale of 60.0 means one real second is one simulated minute.
    #[must_use]
    pub fn new(origin: DateTime<Utc>, scale: f64) -> Self {
        Self {
            origin,
            started: Instant::now(),
            scale: if scale.is_finite() { scale.max(0.0) } else { 1.0 },
        }
    }

    /// Simulated seconds per real second.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Clock for ScaledClock {
    fn now(&self) -> DateTime<Utc> {
        let real = self.started.elapsed().as_secs_f64();
        let simulated_ms = (real * self.scale * 1000.0) as i64;
        self.origin
            .checked_add_signed(Duration::milliseconds(simulated_ms))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a manual clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by a number of simulated minutes.
    /// Out-of-range moves leave the clock where it is.
    pub fn advance_minutes(&self, minutes: i64) {
        if let Some(by) = Duration::try_minutes(minutes) {
            self.try_advance(by);
        }
    }

    /// Moves the clock forward by an arbitrary duration.
    /// Out-of-range moves leave the clock where it is.
    pub fn advance(&self, by: Duration) {
        self.try_advance(by);
    }

    /// Moves the clock by `by`, returning the new time, or `None` without
    /// moving if the result would be out of range.
    pub fn try_advance(&self, by: Duration) -> Option<DateTime<Utc>> {
        let mut now = self.now.lock();
        let next = now.checked_add_signed(by)?;
        *now = next;
        Some(next)
    }

    /// Jumps to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Elapsed simulated minutes between two timestamps, never negative.
#[must_use]
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f32 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        (millis as f64 / MILLIS_PER_MINUTE) as f32
    }
}

/// Tracks when the periodic tick last fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickDriver {
    /// Simulated time between ticks.
    interval_minutes: u32,
    /// Time of the last tick, if any.
    last_tick: Option<DateTime<Utc>>,
    /// Number of ticks fired.
    ticks: u64,
}

impl TickDriver {
    /// Creates a driver that fires every `interval_minutes` of simulated time.
    #[must_use]
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
            last_tick: None,
            ticks: 0,
        }
    }

    /// Whether a tick should fire at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_tick {
            None => true,
            Some(last) => elapsed_minutes(last, now) >= self.interval_minutes as f32,
        }
    }

    /// Records that a tick fired at `now`.
    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_tick = Some(now);
        self.ticks += 1;
    }

    /// Number of ticks fired so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Time of the last tick.
    #[must_use]
    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.last_tick
    }

    /// Configured interval in simulated minutes.
    #[must_use]
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).single().expect("valid date")
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(start());
        clock.advance_minutes(90);
        assert_eq!(clock.now(), start() + Duration::minutes(90));
    }

    #[test]
    fn test_manual_clock_rejects_overflow() {
        let clock = ManualClock::new(start());
        assert!(clock.try_advance(Duration::days(365 * 300_000)).is_none());
        clock.advance_minutes(i64::MAX);
        assert_eq!(clock.now(), start());
        assert_eq!(
            clock.try_advance(Duration::minutes(5)),
            Some(start() + Duration::minutes(5))
        );
    }

    #[test]
    fn test_scaled_clock_saturates() {
        let clock = ScaledClock::new(DateTime::<Utc>::MAX_UTC, 1e12);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_elapsed_minutes() {
        let t0 = start();
        assert!((elapsed_minutes(t0, t0 + Duration::seconds(90)) - 1.5).abs() < 1e-6);
        assert_eq!(elapsed_minutes(t0 + Duration::minutes(5), t0), 0.0);
    }

    #[test]
    fn test_tick_driver_interval() {
        let mut driver = TickDriver::new(1);
        let t0 = start();
        assert!(driver.is_due(t0));
        driver.mark(t0);
        assert!(!driver.is_due(t0 + Duration::seconds(30)));
        assert!(driver.is_due(t0 + Duration::minutes(1)));
        assert_eq!(driver.tick_count(), 1);
    }

    #[test]
    fn test_scaled_clock_never_runs_backwards() {
        let clock = ScaledClock::new(start(), 60.0);
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a >= start());
    }
}
