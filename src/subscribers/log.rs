//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [run-starting] machine="countdown" tick=100ms
//! [tick] machine="countdown" n=1 took=3ms
//! [overrun] machine="countdown" n=2 took=140ms budget=100ms
//! [pause-requested] machine="countdown"
//! [step-requested] machine="countdown" n=3
//! [finished] machine="countdown" n=3
//! [run-stopped] machine="countdown" ticks=3 reason="finished"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter {
    quiet_ticks: bool,
}

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip `TickCompleted` lines (overruns are still printed).
    #[must_use]
    pub fn quiet_ticks(mut self) -> Self {
        self.quiet_ticks = true;
        self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let m = e.machine.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::RunStarting => {
                println!("[run-starting] machine={m:?} tick={:?}ms", e.budget_ms);
            }
            EventKind::TickCompleted => {
                if !self.quiet_ticks {
                    println!("[tick] machine={m:?} n={:?} took={:?}ms", e.tick, e.elapsed_ms);
                }
            }
            EventKind::TickOverrun => {
                println!(
                    "[overrun] machine={m:?} n={:?} took={:?}ms budget={:?}ms",
                    e.tick, e.elapsed_ms, e.budget_ms
                );
            }
            EventKind::PauseRequested => println!("[pause-requested] machine={m:?}"),
            EventKind::ResumeRequested => println!("[resume-requested] machine={m:?}"),
            EventKind::StepRequested => {
                println!("[step-requested] machine={m:?} n={:?}", e.tick);
            }
            EventKind::StopRequested => println!("[stop-requested] machine={m:?}"),
            EventKind::MachineFinished => {
                println!("[finished] machine={m:?} n={:?}", e.tick);
            }
            EventKind::StepFailed => {
                println!("[step-failed] machine={m:?} n={:?} err={:?}", e.tick, e.reason);
            }
            EventKind::RunStopped => {
                println!(
                    "[run-stopped] machine={m:?} ticks={:?} reason={:?}",
                    e.tick, e.reason
                );
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={m} reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={m} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
