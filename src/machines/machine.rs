//! # Step machine and factory contracts.
//!
//! A [`StepMachine`] is the unit of domain work the driver repeatedly steps. The driver
//! only sees two contract points: the completion query [`StepMachine::finished`] and the
//! step operation [`StepMachine::step`].
//!
//! A [`MachineFactory`] builds a fresh machine for every run. It owns whatever
//! configuration the machine needs; the driver never inspects it.

use crate::error::StepError;

/// # Stateful unit stepped at a fixed cadence.
///
/// The machine is moved onto the worker thread on `start` and is only touched from there:
/// `step` and `finished` are never called concurrently.
///
/// # Example
/// ```
/// use tickvisor::{StepError, StepMachine};
///
/// struct Countdown(u32);
///
/// impl StepMachine for Countdown {
///     fn finished(&self) -> bool { self.0 == 0 }
///
///     fn step(&mut self) -> Result<(), StepError> {
///         self.0 -= 1;
///         Ok(())
///     }
/// }
///
/// let mut m = Countdown(1);
/// m.step().unwrap();
/// assert!(m.finished());
/// ```
pub trait StepMachine: Send + 'static {
    /// Returns `true` once the machine considers its run complete.
    ///
    /// Polled once per loop iteration; must be cheap and side-effect free.
    fn finished(&self) -> bool;

    /// Performs one unit of work.
    ///
    /// Should return well within the tick interval. Overruns are tolerated, but there is
    /// no mid-step cancellation: a step that never returns stalls `stop`.
    fn step(&mut self) -> Result<(), StepError>;

    /// Human-readable name (for events).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// # Builds a fresh [`StepMachine`] per run.
pub trait MachineFactory: Send + Sync + 'static {
    /// Machine produced by this factory.
    type Machine: StepMachine;

    /// Constructs a new machine for a run that is about to start.
    fn build(&self) -> Result<Self::Machine, StepError>;
}
