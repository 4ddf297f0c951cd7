//! Error types used by the tickvisor driver and step machines.
//!
//! This module defines two main error enums:
//!
//! - [`DriverError`]: errors returned by the control surface of a [`Driver`](crate::Driver).
//! - [`StepError`]: errors raised by a [`StepMachine`](crate::StepMachine) while building or stepping.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

use crate::core::DriverState;

/// # Errors produced by the driver control surface.
///
/// Misuse errors ([`DriverError::InvalidTransition`]) are detected synchronously and
/// returned from the offending call. Collaborator failures stay local to the worker
/// thread until they are surfaced by [`Driver::stop`](crate::Driver::stop).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriverError {
    /// The operation is not allowed in the driver's current lifecycle state.
    #[error("cannot {op} while {state}")]
    InvalidTransition {
        /// Name of the rejected operation (`start`, `pause`, `resume`, `step`).
        op: &'static str,
        /// State observed when the operation was attempted.
        state: DriverState,
    },

    /// The run ended before a requested single step completed.
    #[error("run ended before the requested step completed")]
    Interrupted,

    /// The step machine could not be constructed for a new run.
    #[error("failed to build step machine: {0}")]
    Build(#[source] StepError),

    /// The run terminated because the step machine failed.
    #[error("run terminated by step failure: {0}")]
    Step(#[source] StepError),

    /// The worker runtime could not be created.
    #[error("failed to build worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked outside of a step.
    #[error("worker thread panicked: {info}")]
    WorkerPanicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl DriverError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::{DriverError, DriverState};
    ///
    /// let err = DriverError::InvalidTransition { op: "step", state: DriverState::Running };
    /// assert_eq!(err.as_label(), "driver_invalid_transition");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DriverError::InvalidTransition { .. } => "driver_invalid_transition",
            DriverError::Interrupted => "driver_interrupted",
            DriverError::Build(_) => "driver_build_failed",
            DriverError::Step(_) => "driver_step_failed",
            DriverError::Runtime(_) => "driver_runtime_failed",
            DriverError::Spawn(_) => "driver_spawn_failed",
            DriverError::WorkerPanicked { .. } => "driver_worker_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DriverError::InvalidTransition { op, state } => {
                format!("invalid transition: {op} in state {state}")
            }
            DriverError::Interrupted => "step interrupted".to_string(),
            DriverError::Build(e) => format!("build: {}", e.as_message()),
            DriverError::Step(e) => format!("step: {}", e.as_message()),
            DriverError::Runtime(e) => format!("runtime: {e}"),
            DriverError::Spawn(e) => format!("spawn: {e}"),
            DriverError::WorkerPanicked { info } => format!("worker panic: {info}"),
        }
    }

    /// Returns the step machine failure that ended the run, if any.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            DriverError::Step(e) | DriverError::Build(e) => Some(e),
            _ => None,
        }
    }
}

/// # Errors produced by a step machine.
///
/// Any of these ends the current run; the driver never retries a failed step.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The step failed; the machine may be restartable with a fresh run.
    #[error("step failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error reported by the machine.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The step panicked; the panic was caught on the worker thread.
    #[error("step panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl StepError {
    /// Shorthand for [`StepError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        StepError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`StepError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        StepError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::StepError;
    ///
    /// assert_eq!(StepError::fail("boom").as_label(), "step_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StepError::Fail { .. } => "step_failed",
            StepError::Fatal { .. } => "step_fatal",
            StepError::Panicked { .. } => "step_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StepError::Fail { error } => format!("error: {error}"),
            StepError::Fatal { error } => format!("fatal: {error}"),
            StepError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Indicates whether the failure came from a caught panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, StepError::Panicked { .. })
    }
}

/// Renders a panic payload the way `std` prints it.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
