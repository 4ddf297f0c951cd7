//! # Driver: the control surface of a periodic run.
//!
//! [`Driver`] owns the machine factory, the configuration and (while a run is active) the
//! worker thread. Every control call only flips signals in the run's control block or
//! waits on them; the machine itself is never touched from the controller side.
//!
//! ## Lifecycle
//! ```text
//! start():  build machine ─► fresh RunControl ─► publish RunStarting ─► spawn worker
//! pause():  run.clear()
//! resume(): run.set()
//! step():   end_of_step.clear() ─► step_request.set() ─► wait step_served (set only by the
//!           tick that consumed the request)
//! stop():   stop.cancel() ─► join worker ─► surface step failure (if any) ─► Idle
//! ```
//!
//! ## Rules
//! - At most **one** worker thread per driver; `start` is rejected unless [`DriverState::Idle`]
//! - `stop` is idempotent and is also the only way out of [`DriverState::Done`]
//! - `step` and `stop` block the calling thread; do not call them from async code that
//!   shares a thread with other tasks
//! - Dropping the driver stops the active run and joins its worker
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Driver, DriverConfig, MachineFn, StepError, StepMachine};
//!
//! struct Countdown(u32);
//!
//! impl StepMachine for Countdown {
//!     fn finished(&self) -> bool { self.0 == 0 }
//!     fn step(&mut self) -> Result<(), StepError> { self.0 -= 1; Ok(()) }
//! }
//!
//! let driver = Driver::new(
//!     DriverConfig::with_tick(Duration::from_millis(5)),
//!     MachineFn::new("countdown", || Ok(Countdown(3))),
//! );
//!
//! driver.start().unwrap();
//! driver.wait_done();
//! assert_eq!(driver.ticks(), 3);
//! driver.stop().unwrap();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use futures::executor::block_on;

use super::{
    builder::DriverBuilder,
    config::DriverConfig,
    control::RunControl,
    state::DriverState,
    worker::{self, Worker, WorkerParams},
};
use crate::{
    error::{DriverError, StepError, panic_info},
    events::{Bus, Event, EventKind},
    machines::{MachineFactory, StepMachine},
    subscribers::Subscribe,
};

/// Controller-side view of the active run.
#[derive(Clone)]
struct ActiveRun {
    ctl: Arc<RunControl>,
    machine: Arc<str>,
}

impl ActiveRun {
    fn state(&self) -> DriverState {
        if self.ctl.done.is_cancelled() {
            DriverState::Done
        } else if self.ctl.run.is_set() {
            DriverState::Running
        } else {
            DriverState::Paused
        }
    }
}

/// Runs a [`StepMachine`] at a fixed cadence on a dedicated worker thread.
///
/// All methods take `&self`; the driver can be shared (e.g. in an `Arc`) between threads.
pub struct Driver<F: MachineFactory> {
    cfg: DriverConfig,
    factory: F,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,

    /// Worker thread of the current run; held across `start`/`stop` to serialize them.
    worker: Mutex<Option<JoinHandle<Result<(), StepError>>>>,
    /// Control block of the current run; held only briefly.
    current: Mutex<Option<ActiveRun>>,
}

impl<F: MachineFactory> Driver<F> {
    /// Creates a driver without subscribers.
    pub fn new(cfg: DriverConfig, factory: F) -> Self {
        Self::builder(cfg, factory).build()
    }

    /// Returns a builder for a driver with optional subscribers.
    pub fn builder(cfg: DriverConfig, factory: F) -> DriverBuilder<F> {
        DriverBuilder::new(cfg, factory)
    }

    pub(crate) fn new_internal(
        cfg: DriverConfig,
        factory: F,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        Self {
            bus: Bus::new(cfg.bus_capacity_clamped()),
            cfg,
            factory,
            subscribers,
            worker: Mutex::new(None),
            current: Mutex::new(None),
        }
    }

    /// Returns the driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.cfg
    }

    /// Returns the event bus; receivers see events published after they subscribe.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts a new run with a freshly built machine and worker thread.
    ///
    /// Returns immediately; the first tick happens on the worker (unless the driver is
    /// configured with `start_paused`).
    ///
    /// ### Errors
    /// - [`DriverError::InvalidTransition`] unless the driver is [`DriverState::Idle`]
    /// - [`DriverError::Build`] if the factory fails; the driver stays idle
    /// - [`DriverError::Runtime`] / [`DriverError::Spawn`] if the worker cannot be launched
    pub fn start(&self) -> Result<(), DriverError> {
        let mut worker_slot = lock(&self.worker);
        if worker_slot.is_some() {
            return Err(DriverError::InvalidTransition {
                op: "start",
                state: self.state(),
            });
        }

        let machine = self.factory.build().map_err(DriverError::Build)?;
        let name: Arc<str> = Arc::from(machine.name());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(DriverError::Runtime)?;

        let ctl = Arc::new(RunControl::new(self.cfg.start_paused));
        let events = (!self.subscribers.is_empty()).then(|| self.bus.subscribe());
        *lock(&self.current) = Some(ActiveRun {
            ctl: Arc::clone(&ctl),
            machine: Arc::clone(&name),
        });
        self.bus.publish(
            Event::new(EventKind::RunStarting)
                .with_machine(Arc::clone(&name))
                .with_budget(self.cfg.tick),
        );

        let worker = Worker::new(
            machine,
            name,
            ctl,
            WorkerParams::from(&self.cfg),
            self.bus.clone(),
        );
        match worker::launch(
            worker,
            runtime,
            self.subscribers.clone(),
            events,
            self.cfg.thread_name.clone(),
        ) {
            Ok(handle) => {
                *worker_slot = Some(handle);
                Ok(())
            }
            Err(e) => {
                *lock(&self.current) = None;
                Err(DriverError::Spawn(e))
            }
        }
    }

    /// Stops the current run and waits for its worker thread to exit.
    ///
    /// Cuts short a pending tick wait or paused wait, but never interrupts a step in
    /// progress. No-op when idle.
    ///
    /// ### Errors
    /// - [`DriverError::Step`] if the run ended because the machine failed or panicked
    /// - [`DriverError::WorkerPanicked`] if the worker thread panicked outside of a step
    ///
    /// The driver is [`DriverState::Idle`] afterwards in every case.
    pub fn stop(&self) -> Result<(), DriverError> {
        let mut worker_slot = lock(&self.worker);
        let Some(handle) = worker_slot.take() else {
            return Ok(());
        };

        if let Some(active) = self.active() {
            if !active.ctl.done.is_cancelled() {
                self.bus
                    .publish(Event::new(EventKind::StopRequested).with_machine(active.machine));
            }
            active.ctl.stop.cancel();
        }

        let joined = handle.join();
        *lock(&self.current) = None;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Step(e)),
            Err(payload) => Err(DriverError::WorkerPanicked {
                info: panic_info(&*payload),
            }),
        }
    }

    /// Forbids further ticks until [`resume`](Self::resume) or [`step`](Self::step).
    ///
    /// Non-blocking; a tick already in progress runs to completion. Pausing a paused
    /// driver is a no-op.
    ///
    /// ### Errors
    /// [`DriverError::InvalidTransition`] unless running or paused.
    pub fn pause(&self) -> Result<(), DriverError> {
        let active = self.active_in("pause", DriverState::is_active)?;
        if active.ctl.run.clear() {
            self.bus
                .publish(Event::new(EventKind::PauseRequested).with_machine(active.machine));
        }
        Ok(())
    }

    /// Permits ticks again and wakes a paused worker.
    ///
    /// Non-blocking. Resuming a running driver is a no-op.
    ///
    /// ### Errors
    /// [`DriverError::InvalidTransition`] unless running or paused.
    pub fn resume(&self) -> Result<(), DriverError> {
        let active = self.active_in("resume", DriverState::is_active)?;
        if !active.ctl.run.set() {
            self.bus
                .publish(Event::new(EventKind::ResumeRequested).with_machine(active.machine));
        }
        Ok(())
    }

    /// Executes exactly one tick and returns once it has completed.
    ///
    /// A tick still in flight when the driver was paused does not count: only the tick the
    /// worker runs for this request does. The driver stays paused afterwards.
    ///
    /// ### Errors
    /// - [`DriverError::InvalidTransition`] unless paused
    /// - [`DriverError::Interrupted`] if the run ends before the tick completes
    pub fn step(&self) -> Result<(), DriverError> {
        let active = self.active_in("step", |s| s == DriverState::Paused)?;
        let ctl = &active.ctl;

        ctl.end_of_step.clear();
        ctl.step_served.clear();
        self.bus.publish(
            Event::new(EventKind::StepRequested)
                .with_machine(Arc::clone(&active.machine))
                .with_tick(ctl.ticks() + 1),
        );
        ctl.step_request.set();

        block_on(async {
            tokio::select! {
                biased;
                _ = ctl.step_served.wait_set() => Ok(()),
                _ = ctl.done.cancelled() => Err(DriverError::Interrupted),
            }
        })
    }

    /// Returns `true` iff a run is active, not done, and permitted to tick.
    ///
    /// Reflects "permitted to run", not "currently inside a step".
    pub fn is_running(&self) -> bool {
        self.state() == DriverState::Running
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.active()
            .map_or(DriverState::Idle, |active| active.state())
    }

    /// Returns `true` once the current run's worker has left its loop and released the machine.
    ///
    /// `false` when idle.
    pub fn is_done(&self) -> bool {
        self.active()
            .is_some_and(|active| active.ctl.done.is_cancelled())
    }

    /// Blocks until the current run is done. Returns immediately when idle.
    pub fn wait_done(&self) {
        if let Some(active) = self.active() {
            block_on(active.ctl.done.cancelled());
        }
    }

    /// Number of ticks started in the current run (0 when idle).
    pub fn ticks(&self) -> u64 {
        self.active().map_or(0, |active| active.ctl.ticks())
    }

    fn active(&self) -> Option<ActiveRun> {
        lock(&self.current).clone()
    }

    fn active_in(
        &self,
        op: &'static str,
        allowed: impl Fn(DriverState) -> bool,
    ) -> Result<ActiveRun, DriverError> {
        let active = self.active();
        let state = active.as_ref().map_or(DriverState::Idle, ActiveRun::state);
        match active {
            Some(active) if allowed(state) => Ok(active),
            _ => Err(DriverError::InvalidTransition { op, state }),
        }
    }
}

impl<F: MachineFactory> Drop for Driver<F> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
