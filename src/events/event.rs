//! # Runtime events emitted by the driver and its worker thread.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Control events**: requests issued by the controller (pause, resume, step, stop)
//! - **Run events**: worker-side progress (run starting, ticks, overruns, termination)
//! - **Subscriber events**: delivery problems in the fan-out (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, machine name,
//! tick number, timing and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TickOverrun)
//!     .with_machine("mixer")
//!     .with_tick(7)
//!     .with_elapsed(Duration::from_millis(140))
//!     .with_budget(Duration::from_millis(100));
//!
//! assert_eq!(ev.kind, EventKind::TickOverrun);
//! assert_eq!(ev.machine.as_deref(), Some("mixer"));
//! assert_eq!(ev.elapsed_ms, Some(140));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `machine`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `machine`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Control events ===
    /// `pause` accepted by the driver.
    ///
    /// Sets:
    /// - `machine`: machine name
    PauseRequested,

    /// `resume` accepted by the driver.
    ///
    /// Sets:
    /// - `machine`: machine name
    ResumeRequested,

    /// `step` accepted; the worker will run exactly one tick for it.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: ticks started so far, plus one
    StepRequested,

    /// `stop` called on an active run.
    ///
    /// Sets:
    /// - `machine`: machine name
    StopRequested,

    // === Run events ===
    /// A new run was started (fresh machine, fresh worker thread).
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `budget_ms`: configured tick interval (ms)
    RunStarting,

    /// One tick finished within its budget.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: tick number (1-based, per run)
    /// - `elapsed_ms`: time spent inside `step` (ms)
    /// - `budget_ms`: tick interval (ms)
    TickCompleted,

    /// One tick took longer than its budget; the next tick starts late.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: tick number
    /// - `elapsed_ms`: time spent inside `step` (ms)
    /// - `budget_ms`: tick interval (ms)
    TickOverrun,

    /// The machine reported `finished()`; the run ends without `stop`.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: last tick number
    MachineFinished,

    /// `step` returned an error or panicked; the run ends.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: failing tick number
    /// - `reason`: failure message
    StepFailed,

    /// The worker left its loop and released the machine.
    ///
    /// Sets:
    /// - `machine`: machine name
    /// - `tick`: ticks started during the run
    /// - `reason`: `finished`, `stopped` or `failed`
    RunStopped,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::PauseRequested => "pause_requested",
            EventKind::ResumeRequested => "resume_requested",
            EventKind::StepRequested => "step_requested",
            EventKind::StopRequested => "stop_requested",
            EventKind::RunStarting => "run_starting",
            EventKind::TickCompleted => "tick_completed",
            EventKind::TickOverrun => "tick_overrun",
            EventKind::MachineFinished => "machine_finished",
            EventKind::StepFailed => "step_failed",
            EventKind::RunStopped => "run_stopped",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the machine (or subscriber), if applicable.
    pub machine: Option<Arc<str>>,
    /// Tick number within the run (starting from 1).
    pub tick: Option<u64>,
    /// Time spent in the step in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Tick interval in milliseconds (compact).
    pub budget_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            machine: None,
            tick: None,
            elapsed_ms: None,
            budget_ms: None,
            reason: None,
        }
    }

    /// Returns the stable label of this event's kind.
    #[inline]
    pub fn label(&self) -> &'static str {
        self.kind.as_label()
    }

    /// Attaches a machine name.
    #[inline]
    pub fn with_machine(mut self, machine: impl Into<Arc<str>>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Attaches a tick number.
    #[inline]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attaches the time spent in a step (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Attaches the tick interval (stored as milliseconds).
    #[inline]
    pub fn with_budget(mut self, d: Duration) -> Self {
        self.budget_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_machine(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_machine(subscriber)
            .with_reason(info)
    }

    /// Creates an overflow event for a bus receiver that fell `missed` events behind.
    pub fn bus_lagged(missed: u64) -> Self {
        Event::new(EventKind::SubscriberOverflow).with_reason(format!("lagged missed={missed}"))
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::PauseRequested);
        let b = Event::new(EventKind::ResumeRequested);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate_at_u32_millis() {
        let ev = Event::new(EventKind::TickOverrun).with_elapsed(Duration::from_secs(u64::MAX));
        assert_eq!(ev.elapsed_ms, Some(u32::MAX));
    }

    #[test]
    fn lag_is_reported_as_overflow() {
        let ev = Event::bus_lagged(12);
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.reason.as_deref(), Some("lagged missed=12"));
    }

    #[test]
    fn overflow_event_names_subscriber() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.machine.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
        assert_eq!(ev.label(), "subscriber_overflow");
    }
}
