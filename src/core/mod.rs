//! Driver core: tick timing and the cross-thread control protocol.
//!
//! The public API from this module is [`Driver`] (with [`DriverBuilder`],
//! [`DriverConfig`], [`DriverState`]) and the standalone [`TickTimer`].
//!
//! Internal modules:
//! - [`signal`]: boolean flag with async wait (watch-backed);
//! - [`control`]: per-run block of signals shared by controller and worker;
//! - [`tick`]: duration-compensated tick execution and the interruptible wait;
//! - [`worker`]: the tick loop running on the worker thread;
//! - [`driver`]: start/stop/pause/resume/step on the controller side.

mod builder;
mod config;
mod control;
mod driver;
mod signal;
mod state;
mod tick;
mod worker;

pub use builder::DriverBuilder;
pub use config::DriverConfig;
pub use driver::Driver;
pub use state::DriverState;
pub use tick::{TickReport, TickTimer};
