//! # Example: stepping
//!
//! Drives a traffic light one tick at a time from the controlling thread, then lets it
//! run freely and stops it while it is waiting for the next tick.
//!
//! Demonstrates how to:
//! - Start a run paused with `DriverConfig::start_paused`.
//! - Advance exactly one tick with [`Driver::step`].
//! - Read [`Driver::state`] and [`Driver::ticks`] between steps.
//! - Stop a run that never finishes on its own.
//!
//! ## Run
//! ```bash
//! cargo run --example stepping
//! ```

use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use tickvisor::{Driver, DriverConfig, MachineFn, StepError, StepMachine};

#[derive(Clone, Copy, Debug)]
enum Light {
    Red,
    Green,
    Yellow,
}

struct TrafficLight {
    light: Light,
    shown: Arc<Mutex<Light>>,
}

impl StepMachine for TrafficLight {
    fn finished(&self) -> bool {
        false
    }

    fn step(&mut self) -> Result<(), StepError> {
        self.light = match self.light {
            Light::Red => Light::Green,
            Light::Green => Light::Yellow,
            Light::Yellow => Light::Red,
        };
        *self
            .shown
            .lock()
            .map_err(|_| StepError::fatal("display lock poisoned"))? = self.light;
        Ok(())
    }

    fn name(&self) -> &str {
        "traffic-light"
    }
}

fn main() -> anyhow::Result<()> {
    let shown = Arc::new(Mutex::new(Light::Red));

    let mut cfg = DriverConfig::with_tick(Duration::from_millis(200));
    cfg.start_paused = true;

    let display = Arc::clone(&shown);
    let driver = Driver::new(
        cfg,
        MachineFn::new("traffic-light", move || {
            Ok(TrafficLight {
                light: Light::Red,
                shown: Arc::clone(&display),
            })
        }),
    );

    driver.start()?;
    for _ in 0..4 {
        driver.step()?;
        println!(
            "[main] state={} tick={} light={:?}",
            driver.state(),
            driver.ticks(),
            *shown.lock().map_err(|_| anyhow::anyhow!("display lock poisoned"))?
        );
    }

    driver.resume()?;
    println!("[main] running freely");
    thread::sleep(Duration::from_millis(700));

    driver.stop()?;
    println!(
        "[main] stopped, light={:?}",
        *shown.lock().map_err(|_| anyhow::anyhow!("display lock poisoned"))?
    );
    Ok(())
}
