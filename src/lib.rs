//! # tickvisor
//!
//! **Tickvisor** runs a stateful step machine at a fixed cadence on a dedicated worker
//! thread, and exposes a control surface (start, stop, pause, resume, single step) that
//! another thread can call at any time.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Controller thread                          Worker thread (one per run)
//! ┌──────────────────────┐                  ┌──────────────────────────────────┐
//! │ Driver               │                  │ current-thread tokio runtime     │
//! │  start()  ───────────┼── spawn ────────►│  Worker::run()                   │
//! │  pause()/resume() ───┼── run ──────────►│   loop {                         │
//! │  step()   ───────────┼── step_request ─►│     TickTimer::run(step, wait)   │
//! │           ◄──────────┼── step_served ───│     park() while run is clear    │
//! │  stop()   ───────────┼── stop ─────────►│   }                              │
//! │           ◄──────────┼── join ──────────│  drop(machine); done             │
//! └──────────┬───────────┘                  └───────────────┬──────────────────┘
//!            │ publish                                      │ publish
//!            ▼                                              ▼
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                       Bus (broadcast channel)                               │
//! └──────────────────────────────────────┬──────────────────────────────────────┘
//!                                        ▼
//!                         forward() ──► SubscriberSet ──► Subscribe::on_event()
//! ```
//!
//! ### Tick discipline
//! ```text
//! |◄──────── tick ────────►|◄──────── tick ────────►|◄── overrun ──►|◄──── tick ...
//! [ step ][ wait remaining ][ step ][ wait remaining ][ step (long)   ][ step ]...
//! ```
//! A step that finishes early is padded to the tick interval; a step that overruns is
//! followed immediately by the next one. No tick is ever skipped to catch up.
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                       |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Driver**        | Start/stop/pause/resume/step a periodic run.             | [`Driver`], [`DriverState`]              |
//! | **Machines**      | The stateful unit being stepped and its factory.         | [`StepMachine`], [`MachineFactory`], [`MachineFn`] |
//! | **Timing**        | Duration-compensated execution of one tick.              | [`TickTimer`], [`TickReport`]            |
//! | **Subscriber API**| Hook into run events (logging, metrics, custom).         | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Errors**        | Typed errors for control misuse and step failures.       | [`DriverError`], [`StepError`]           |
//! | **Configuration** | Tick interval, paused-wait re-check, bus capacity.       | [`DriverConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Driver, DriverConfig, DriverState, MachineFn, StepError, StepMachine};
//!
//! struct Heater { temp: u32, target: u32 }
//!
//! impl StepMachine for Heater {
//!     fn finished(&self) -> bool { self.temp >= self.target }
//!     fn step(&mut self) -> Result<(), StepError> {
//!         self.temp += 5;
//!         Ok(())
//!     }
//!     fn name(&self) -> &str { "heater" }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = DriverConfig::with_tick(Duration::from_millis(10));
//!     cfg.start_paused = true;
//!
//!     let driver = Driver::new(cfg, MachineFn::new("heater", || Ok(Heater { temp: 20, target: 40 })));
//!
//!     driver.start()?;
//!     driver.step()?;                       // exactly one tick, stays paused
//!     assert_eq!(driver.ticks(), 1);
//!     assert_eq!(driver.state(), DriverState::Paused);
//!
//!     driver.resume()?;                     // run the remaining ticks
//!     driver.wait_done();
//!     assert_eq!(driver.ticks(), 4);
//!
//!     driver.stop()?;                       // join the worker, back to Idle
//!     assert_eq!(driver.state(), DriverState::Idle);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod machines;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Driver, DriverBuilder, DriverConfig, DriverState, TickReport, TickTimer};
pub use error::{DriverError, StepError};
pub use events::{Bus, Event, EventKind};
pub use machines::{MachineFactory, MachineFn, StepMachine};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
