//! # Example: countdown
//!
//! A countdown machine driven at 100ms with the built-in [`LogWriter`] attached.
//!
//! Demonstrates how to:
//! - Implement [`StepMachine`] for a small stateful unit.
//! - Attach subscribers through [`Driver::builder`].
//! - Pause and resume a run from the controlling thread.
//! - Observe an overrun: one step takes longer than the tick interval.
//!
//! ## Flow
//! ```text
//! Driver::start()
//!     ├─► publish(RunStarting)
//!     └─► worker thread
//!           ├─► step ─► publish(TickCompleted | TickOverrun)
//!           ├─► park while paused
//!           ├─► publish(MachineFinished)
//!           └─► publish(RunStopped)
//! Driver::stop() ─► join worker
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example countdown --features logging
//! ```

use std::{sync::Arc, thread, time::Duration};

use tickvisor::{Driver, DriverConfig, LogWriter, MachineFn, StepError, StepMachine, Subscribe};

struct Countdown {
    left: u32,
}

impl StepMachine for Countdown {
    fn finished(&self) -> bool {
        self.left == 0
    }

    fn step(&mut self) -> Result<(), StepError> {
        println!("[countdown] {}", self.left);
        if self.left == 5 {
            // Longer than the tick: the next step follows immediately.
            thread::sleep(Duration::from_millis(150));
        }
        self.left -= 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "countdown"
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = DriverConfig::with_tick(Duration::from_millis(100));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let driver = Driver::builder(cfg, MachineFn::new("countdown", || Ok(Countdown { left: 8 })))
        .with_subscribers(subs)
        .build();

    driver.start()?;
    thread::sleep(Duration::from_millis(250));

    driver.pause()?;
    println!("[main] paused at tick {}", driver.ticks());
    thread::sleep(Duration::from_millis(400));

    driver.resume()?;
    driver.wait_done();

    println!("[main] finished after {} ticks", driver.ticks());
    driver.stop()?;
    Ok(())
}
