//! # Driver lifecycle state.
//!
//! ```text
//! Idle ──start──► Running ◄──resume── Paused ──step──► Paused (one tick)
//!                    │ ──────pause──────►│
//!                    └──(machine finished, step failed)──► Done
//! Running | Paused | Done ──stop──► Idle
//! ```

use std::fmt;

/// Observable lifecycle state of a [`Driver`](crate::Driver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// No run exists; `start` is allowed.
    Idle,
    /// The worker is permitted to execute ticks.
    Running,
    /// The worker blocks between ticks until `resume` or `step`.
    Paused,
    /// The run ended on its own; `stop` returns the driver to `Idle`.
    Done,
}

impl DriverState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DriverState::Idle => "idle",
            DriverState::Running => "running",
            DriverState::Paused => "paused",
            DriverState::Done => "done",
        }
    }

    /// Returns `true` while a run is active and not yet done.
    pub fn is_active(self) -> bool {
        matches!(self, DriverState::Running | DriverState::Paused)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
