//! # Step machine abstractions.
//!
//! - [`StepMachine`] - trait for the stateful unit the driver steps
//! - [`MachineFactory`] - builds a fresh machine for every run
//! - [`MachineFn`] - closure-backed factory

mod machine;
mod machine_fn;

pub use machine::{MachineFactory, StepMachine};
pub use machine_fn::MachineFn;
