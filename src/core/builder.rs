use std::sync::Arc;

use super::{config::DriverConfig, driver::Driver};
use crate::{machines::MachineFactory, subscribers::Subscribe};

/// Builder for constructing a [`Driver`] with optional features.
pub struct DriverBuilder<F> {
    cfg: DriverConfig,
    factory: F,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<F: MachineFactory> DriverBuilder<F> {
    /// Creates a new builder with the given configuration and machine factory.
    pub fn new(cfg: DriverConfig, factory: F) -> Self {
        Self {
            cfg,
            factory,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive driver events (ticks, overruns, control requests, termination)
    /// through dedicated workers with bounded queues. The same subscribers serve every run.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the driver. No run is started.
    pub fn build(self) -> Driver<F> {
        Driver::new_internal(self.cfg, self.factory, self.subscribers)
    }
}
