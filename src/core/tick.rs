//! # Duration-compensated tick execution.
//!
//! [`TickTimer`] runs one unit of work and then waits for whatever is left of a fixed
//! budget, so that consecutive ticks start at a regular cadence regardless of how long
//! each unit of work takes.
//!
//! ```text
//! start ──► work() ──► remaining = budget - elapsed
//!                          ├─ remaining > 0  ─► wait(remaining)   (interruptible)
//!                          └─ remaining <= 0 ─► return at once     (overrun absorbed)
//! ```
//!
//! ## Rules
//! - `work` runs **exactly once**, synchronously, on the calling thread
//! - An overrun is **not** an error and is never compensated; the next tick simply starts late
//! - An `Err` from `work` is returned as is, **without** waiting out the budget
//! - The wait is supplied by the caller so it can be cut short by a stop signal

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport<T> {
    /// Value returned by the work.
    pub value: T,
    /// Time spent inside the work.
    pub elapsed: Duration,
    /// How far the work ran past the budget, if it did.
    pub overrun: Option<Duration>,
}

/// Runs work within a fixed wall-clock budget.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tickvisor::TickTimer;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let timer = TickTimer::new(Duration::from_millis(20));
/// let report = timer
///     .run(|| Ok::<_, ()>(7), |left| tokio::time::sleep(left))
///     .await
///     .unwrap();
/// assert_eq!(report.value, 7);
/// assert!(report.overrun.is_none());
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TickTimer {
    budget: Duration,
}

impl TickTimer {
    /// Creates a timer with the given per-tick budget.
    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Returns the per-tick budget.
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Executes `work` once and waits out the rest of the budget with `wait`.
    ///
    /// `wait` is only invoked with a strictly positive duration.
    pub async fn run<T, E, W, Fut>(
        &self,
        work: impl FnOnce() -> Result<T, E>,
        wait: W,
    ) -> Result<TickReport<T>, E>
    where
        W: FnOnce(Duration) -> Fut,
        Fut: Future<Output = ()>,
    {
        let start = Instant::now();
        let value = work()?;
        let elapsed = start.elapsed();

        if let Some(remaining) = self.budget.checked_sub(elapsed).filter(|d| !d.is_zero()) {
            wait(remaining).await;
        }
        Ok(TickReport {
            value,
            elapsed,
            overrun: elapsed.checked_sub(self.budget).filter(|d| !d.is_zero()),
        })
    }
}

/// Sleeps for `dur` unless `stop` is cancelled first.
///
/// Returns `true` if the full duration elapsed, `false` if the sleep was cut short.
pub(crate) async fn sleep_or_stop(dur: Duration, stop: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = stop.cancelled() => false,
        _ = time::sleep(dur) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[tokio::test(start_paused = true)]
    async fn instant_work_waits_full_budget() {
        let timer = TickTimer::new(Duration::from_millis(100));
        let asked = Cell::new(None);

        let report = timer
            .run(
                || Ok::<_, ()>(()),
                |left| {
                    asked.set(Some(left));
                    async {}
                },
            )
            .await
            .unwrap();

        assert_eq!(asked.get(), Some(Duration::from_millis(100)));
        assert_eq!(report.overrun, None);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_ticks_start_one_budget_apart() {
        let timer = TickTimer::new(Duration::from_millis(50));
        let starts = RefCell::new(Vec::new());

        for _ in 0..5 {
            timer
                .run(
                    || {
                        starts.borrow_mut().push(Instant::now());
                        Ok::<_, ()>(())
                    },
                    time::sleep,
                )
                .await
                .unwrap();
        }

        let starts = starts.into_inner();
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(50), "gap {gap:?} shorter than budget");
            assert!(gap <= Duration::from_millis(51), "gap {gap:?} drifted");
        }
    }

    #[tokio::test]
    async fn overrun_skips_wait_and_reports() {
        let timer = TickTimer::new(Duration::from_millis(5));
        let waited = Cell::new(false);

        let report = timer
            .run(
                || {
                    std::thread::sleep(Duration::from_millis(25));
                    Ok::<_, ()>("late")
                },
                |_| {
                    waited.set(true);
                    async {}
                },
            )
            .await
            .unwrap();

        assert!(!waited.get());
        assert_eq!(report.value, "late");
        assert!(report.overrun.unwrap() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn work_error_propagates_without_waiting() {
        let timer = TickTimer::new(Duration::from_secs(10));
        let waited = Cell::new(false);

        let res = timer
            .run(
                || Err::<(), _>("boom"),
                |_| {
                    waited.set(true);
                    async {}
                },
            )
            .await;

        assert_eq!(res, Err("boom"));
        assert!(!waited.get());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_pending_sleep_short() {
        let stop = CancellationToken::new();
        let canceller = stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let completed = sleep_or_stop(Duration::from_secs(60), &stop).await;

        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn uncancelled_sleep_runs_to_completion() {
        let stop = CancellationToken::new();
        assert!(sleep_or_stop(Duration::from_millis(10), &stop).await);
    }
}
