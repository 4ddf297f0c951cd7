//! # Driver configuration.
//!
//! Provides [`DriverConfig`], the settings a [`Driver`](crate::Driver) is built with.
//! The tick interval is fixed for the lifetime of the driver; there is no way to change
//! it while a run is active.
//!
//! ## Sentinel values
//! - `tick = 0s` → no compensation wait (ticks run back to back)
//! - `park_recheck`, `bus_capacity` are clamped to sane minimums by their accessors

use std::time::Duration;

/// Configuration for a periodic driver.
///
/// ## Field semantics
/// - `tick`: target time between successive step starts (`0s` = no wait)
/// - `park_recheck`: upper bound on a single paused-wait slice
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `thread_name`: name given to each run's worker thread
/// - `start_paused`: begin every run in the paused state
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Target interval between the starts of two consecutive ticks.
    ///
    /// A step that finishes early is followed by a wait for the remainder of the
    /// interval. A step that overruns is followed immediately by the next one.
    pub tick: Duration,

    /// Maximum time the paused worker waits before re-checking its signals.
    ///
    /// The paused wait already wakes on resume, step and stop; the re-check only
    /// bounds how long a missed wake-up could go unnoticed.
    pub park_recheck: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Name of the worker thread spawned by each `start`.
    pub thread_name: String,

    /// When `true`, every run starts paused: the first tick waits for `resume` or `step`.
    pub start_paused: bool,
}

impl DriverConfig {
    /// Default configuration with the given tick interval.
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Returns the tick budget as an `Option`.
    ///
    /// - `None` → no compensation wait
    /// - `Some(d)` → each tick is padded up to `d`
    #[inline]
    pub fn tick_budget(&self) -> Option<Duration> {
        if self.tick == Duration::ZERO {
            None
        } else {
            Some(self.tick)
        }
    }

    /// Returns the paused-wait re-check slice clamped to at least 1ms.
    #[inline]
    pub fn park_recheck_clamped(&self) -> Duration {
        self.park_recheck.max(Duration::from_millis(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for DriverConfig {
    /// Default configuration:
    ///
    /// - `tick = 100ms`
    /// - `park_recheck = 1s`
    /// - `bus_capacity = 1024`
    /// - `thread_name = "tickvisor-worker"`
    /// - `start_paused = false`
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            park_recheck: Duration::from_secs(1),
            bus_capacity: 1024,
            thread_name: "tickvisor-worker".to_string(),
            start_paused: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_means_no_budget() {
        let cfg = DriverConfig::with_tick(Duration::ZERO);
        assert_eq!(cfg.tick_budget(), None);
        assert_eq!(
            DriverConfig::with_tick(Duration::from_millis(20)).tick_budget(),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn accessors_clamp_degenerate_values() {
        let cfg = DriverConfig {
            park_recheck: Duration::ZERO,
            bus_capacity: 0,
            ..DriverConfig::default()
        };
        assert_eq!(cfg.park_recheck_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
