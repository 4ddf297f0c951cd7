//! # Per-run control block shared by the controller and the worker.
//!
//! Every `start` creates a fresh [`RunControl`], so no signal state leaks from one run
//! into the next. Each signal has a single writer set:
//!
//! | signal         | set by                   | cleared by                 |
//! |----------------|--------------------------|----------------------------|
//! | `run`          | `start`, `resume`        | `pause`                    |
//! | `end_of_step`  | worker, after each step  | worker before a step, `step` |
//! | `stop`         | `stop` (monotonic)       | never                      |
//! | `done`         | worker on exit (monotonic) | never                    |
//! | `step_request` | `step`                   | worker consuming it        |
//! | `step_served`  | worker, after a requested step | `step`               |
//!
//! `step_request` and `step_served` make single stepping exact: the worker only consumes
//! a request from the paused wait, and only the tick that follows sets `step_served`.
//! Neither an in-flight tick nor a tick allowed by a racing `resume` can be mistaken
//! for the requested one.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use super::signal::Signal;

pub(crate) struct RunControl {
    pub(crate) run: Signal,
    pub(crate) end_of_step: Signal,
    pub(crate) stop: CancellationToken,
    pub(crate) done: CancellationToken,
    pub(crate) step_request: Signal,
    pub(crate) step_served: Signal,
    ticks: AtomicU64,
}

impl RunControl {
    pub(crate) fn new(start_paused: bool) -> Self {
        Self {
            run: Signal::new(!start_paused),
            end_of_step: Signal::new(false),
            stop: CancellationToken::new(),
            done: CancellationToken::new(),
            step_request: Signal::new(false),
            step_served: Signal::new(false),
            ticks: AtomicU64::new(0),
        }
    }

    /// Number of ticks started in this run.
    pub(crate) fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Records the start of a tick and returns its 1-based number.
    pub(crate) fn begin_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_block_matches_initial_run_state() {
        let ctl = RunControl::new(false);
        assert!(ctl.run.is_set());
        assert!(!ctl.end_of_step.is_set());
        assert!(!ctl.stop.is_cancelled());
        assert!(!ctl.done.is_cancelled());
        assert_eq!(ctl.ticks(), 0);

        assert!(!RunControl::new(true).run.is_set());
    }

    #[test]
    fn ticks_are_numbered_from_one() {
        let ctl = RunControl::new(false);
        assert_eq!(ctl.begin_tick(), 1);
        assert_eq!(ctl.begin_tick(), 2);
        assert_eq!(ctl.ticks(), 2);
    }
}
