//! # Function-backed machine factory (`MachineFn`)
//!
//! [`MachineFn`] wraps a closure `F: Fn() -> Result<M, StepError>` and calls it once per
//! run. Configuration is whatever the closure captures.
//!
//! ## Example
//! ```rust
//! use tickvisor::{MachineFactory, MachineFn, StepError, StepMachine};
//!
//! struct Blink { left: u8 }
//!
//! impl StepMachine for Blink {
//!     fn finished(&self) -> bool { self.left == 0 }
//!     fn step(&mut self) -> Result<(), StepError> { self.left -= 1; Ok(()) }
//! }
//!
//! let times = 3;
//! let factory = MachineFn::new("blink", move || Ok(Blink { left: times }));
//!
//! assert_eq!(factory.name(), "blink");
//! assert!(!factory.build().unwrap().finished());
//! ```

use std::borrow::Cow;

use crate::error::StepError;
use crate::machines::machine::{MachineFactory, StepMachine};

/// Function-backed factory.
#[derive(Debug)]
pub struct MachineFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> MachineFn<F> {
    /// Creates a new function-backed factory.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Returns the factory name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F, M> MachineFactory for MachineFn<F>
where
    F: Fn() -> Result<M, StepError> + Send + Sync + 'static, // Fn, not FnMut
    M: StepMachine,
{
    type Machine = M;

    fn build(&self) -> Result<M, StepError> {
        (self.f)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Once {
        done: bool,
    }

    impl StepMachine for Once {
        fn finished(&self) -> bool {
            self.done
        }

        fn step(&mut self) -> Result<(), StepError> {
            self.done = true;
            Ok(())
        }
    }

    #[test]
    fn builds_fresh_instance_per_call() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let factory = MachineFn::new("once", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Once { done: false })
        });

        let mut first = factory.build().unwrap();
        first.step().unwrap();
        let second = factory.build().unwrap();

        assert!(first.finished());
        assert!(!second.finished());
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn build_errors_pass_through() {
        let factory = MachineFn::new("broken", || -> Result<Once, StepError> {
            Err(StepError::fatal("no config"))
        });
        assert_eq!(factory.build().err(), Some(StepError::fatal("no config")));
    }
}
