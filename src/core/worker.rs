//! # Worker: the tick loop of one run.
//!
//! Owns the [`StepMachine`] for the lifetime of a run and is the only code that touches it.
//! Runs on a dedicated OS thread that hosts a current-thread tokio runtime; the runtime
//! provides the interruptible waits and drives the run's subscriber workers.
//!
//! ## Architecture
//! ```text
//! [start_paused → park()]
//! loop {
//!   ├─► machine.finished()?  ─► exit (Finished)
//!   ├─► stop cancelled?      ─► exit (Stopped)
//!   ├─► TickTimer::run(
//!   │       work = { end_of_step.clear(); machine.step(); end_of_step.set();
//!   │                [step_served.set() if requested by step] },
//!   │       wait = sleep_or_stop(remaining))
//!   │       ├─ Ok   ─► publish TickCompleted / TickOverrun
//!   │       │         (yield if nothing was awaited)
//!   │       └─ Err  ─► publish StepFailed, exit (Failed)
//!   └─► park() while run is clear:
//!         ├─ resume        ─► continue
//!         ├─ step request  ─► continue (one tick, then park again)
//!         └─ stop          ─► exit (Stopped)
//! }
//! drop(machine) ─► publish RunStopped ─► done
//! ```
//!
//! ## Rules
//! - A step that fails or panics ends the run; it is never retried
//! - `end_of_step` is set after every step, including a failing one
//! - `step_served` is set only after a step that consumed a step request
//! - A tick that awaited nothing yields once, so subscribers keep up with back-to-back ticks
//! - `done` is set after the machine has been dropped, and also if the worker panics

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::{runtime::Runtime, sync::broadcast, task, time};
use tokio_util::sync::CancellationToken;

use super::{
    config::DriverConfig,
    control::RunControl,
    signal::Signal,
    tick::{TickTimer, sleep_or_stop},
};
use crate::{
    error::{StepError, panic_info},
    events::{Bus, Event, EventKind},
    machines::StepMachine,
    subscribers::{Subscribe, SubscriberSet, forward},
};

/// Loop parameters copied out of the driver configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WorkerParams {
    pub(crate) timer: TickTimer,
    pub(crate) budgeted: bool,
    pub(crate) park_recheck: Duration,
    pub(crate) start_paused: bool,
}

impl From<&DriverConfig> for WorkerParams {
    fn from(cfg: &DriverConfig) -> Self {
        Self {
            timer: TickTimer::new(cfg.tick),
            budgeted: cfg.tick_budget().is_some(),
            park_recheck: cfg.park_recheck_clamped(),
            start_paused: cfg.start_paused,
        }
    }
}

/// Why the paused wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Park {
    Resume,
    Step,
    Stop,
}

/// Why the loop ended.
enum Exit {
    Finished,
    Stopped,
    Failed(StepError),
}

pub(crate) struct Worker<M> {
    machine: M,
    name: Arc<str>,
    ctl: Arc<RunControl>,
    params: WorkerParams,
    bus: Bus,
}

impl<M: StepMachine> Worker<M> {
    pub(crate) fn new(
        machine: M,
        name: Arc<str>,
        ctl: Arc<RunControl>,
        params: WorkerParams,
        bus: Bus,
    ) -> Self {
        Self {
            machine,
            name,
            ctl,
            params,
            bus,
        }
    }

    /// Runs the loop to completion and releases the machine.
    ///
    /// Returns the step failure that ended the run, if any.
    pub(crate) async fn run(mut self) -> Result<(), StepError> {
        let done = self.ctl.done.clone().drop_guard();
        let exit = self.drive().await;

        let Worker {
            machine,
            name,
            ctl,
            bus,
            ..
        } = self;
        drop(machine);

        let (reason, res) = match exit {
            Exit::Finished => ("finished", Ok(())),
            Exit::Stopped => ("stopped", Ok(())),
            Exit::Failed(e) => ("failed", Err(e)),
        };
        bus.publish(
            Event::new(EventKind::RunStopped)
                .with_machine(name)
                .with_tick(ctl.ticks())
                .with_reason(reason),
        );
        drop(done);
        res
    }

    async fn drive(&mut self) -> Exit {
        // Set when the upcoming tick was requested by `step`.
        let mut serving = false;
        if self.params.start_paused {
            match self.park().await {
                Park::Stop => return Exit::Stopped,
                p => serving = p == Park::Step,
            }
        }
        loop {
            if self.machine.finished() {
                self.publish(EventKind::MachineFinished, self.ctl.ticks());
                return Exit::Finished;
            }
            if self.ctl.stop.is_cancelled() {
                return Exit::Stopped;
            }

            let tick = self.ctl.begin_tick();
            let machine = &mut self.machine;
            let ctl = &self.ctl;
            let res = self
                .params
                .timer
                .run(
                    || {
                        let res = step_guarded(machine, &ctl.end_of_step);
                        if serving {
                            ctl.step_served.set();
                        }
                        res
                    },
                    |left| async move {
                        sleep_or_stop(left, &ctl.stop).await;
                    },
                )
                .await;

            match res {
                Ok(report) => {
                    let kind = match report.overrun {
                        Some(_) if self.params.budgeted => EventKind::TickOverrun,
                        _ => EventKind::TickCompleted,
                    };
                    self.bus.publish(
                        Event::new(kind)
                            .with_machine(Arc::clone(&self.name))
                            .with_tick(tick)
                            .with_elapsed(report.elapsed)
                            .with_budget(self.params.timer.budget()),
                    );
                    if report.elapsed >= self.params.timer.budget() {
                        // Nothing was awaited; let the forwarder and subscribers run.
                        task::yield_now().await;
                    }
                }
                Err(e) => {
                    self.bus.publish(
                        Event::new(EventKind::StepFailed)
                            .with_machine(Arc::clone(&self.name))
                            .with_tick(tick)
                            .with_reason(e.to_string()),
                    );
                    return Exit::Failed(e);
                }
            }

            match self.park().await {
                Park::Stop => return Exit::Stopped,
                p => serving = p == Park::Step,
            }
        }
    }

    /// Blocks while `run` is clear.
    ///
    /// Wakes on resume, step request or stop, and re-checks every `park_recheck` in case
    /// a wake-up was lost.
    async fn park(&self) -> Park {
        let ctl = &self.ctl;
        if ctl.run.is_set() && !ctl.step_request.is_set() {
            return Park::Resume;
        }

        loop {
            if ctl.stop.is_cancelled() {
                return Park::Stop;
            }
            if ctl.step_request.clear() {
                return Park::Step;
            }
            if ctl.run.is_set() {
                return Park::Resume;
            }
            tokio::select! {
                _ = ctl.stop.cancelled() => {}
                _ = ctl.step_request.wait_set() => {}
                _ = ctl.run.wait_set() => {}
                _ = time::sleep(self.params.park_recheck) => {}
            }
        }
    }

    fn publish(&self, kind: EventKind, tick: u64) {
        self.bus.publish(
            Event::new(kind)
                .with_machine(Arc::clone(&self.name))
                .with_tick(tick),
        );
    }
}

/// Runs one step with `end_of_step` bracketing, converting a panic into a [`StepError`].
fn step_guarded<M: StepMachine>(machine: &mut M, end_of_step: &Signal) -> Result<(), StepError> {
    end_of_step.clear();
    let res = match catch_unwind(AssertUnwindSafe(|| machine.step())) {
        Ok(res) => res,
        Err(payload) => Err(StepError::Panicked {
            info: panic_info(&*payload),
        }),
    };
    end_of_step.set();
    res
}

/// Spawns the worker thread for one run.
///
/// The thread drives `worker` on `runtime`. When subscribers are present, a forwarder
/// task feeds them from `events` and is drained before the thread exits.
pub(crate) fn launch<M: StepMachine>(
    worker: Worker<M>,
    runtime: Runtime,
    subscribers: Vec<Arc<dyn Subscribe>>,
    events: Option<broadcast::Receiver<Event>>,
    thread_name: String,
) -> std::io::Result<thread::JoinHandle<Result<(), StepError>>> {
    let bus = worker.bus.clone();
    thread::Builder::new().name(thread_name).spawn(move || {
        runtime.block_on(async move {
            let closing = CancellationToken::new();
            let forwarder = events.map(|rx| {
                let set = SubscriberSet::new(&subscribers, bus);
                tokio::spawn(forward(rx, set, closing.clone()))
            });

            let res = worker.run().await;

            closing.cancel();
            if let Some(f) = forwarder {
                let _ = f.await;
            }
            res
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Script {
        steps: u32,
        limit: u32,
        fail_at: Option<u32>,
        panic_at: Option<u32>,
    }

    impl Script {
        fn new(limit: u32) -> Self {
            Self {
                steps: 0,
                limit,
                fail_at: None,
                panic_at: None,
            }
        }
    }

    impl StepMachine for Script {
        fn finished(&self) -> bool {
            self.steps >= self.limit
        }

        fn step(&mut self) -> Result<(), StepError> {
            self.steps += 1;
            if self.panic_at == Some(self.steps) {
                panic!("step {} exploded", self.steps);
            }
            if self.fail_at == Some(self.steps) {
                return Err(StepError::fail(format!("step {}", self.steps)));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "script"
        }
    }

    fn worker(machine: Script, ctl: &Arc<RunControl>, bus: &Bus) -> Worker<Script> {
        let cfg = DriverConfig::with_tick(Duration::from_millis(10));
        Worker::new(
            machine,
            Arc::from("script"),
            Arc::clone(ctl),
            WorkerParams::from(&cfg),
            bus.clone(),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_machine_finishes() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let ctl = Arc::new(RunControl::new(false));

        let res = worker(Script::new(3), &ctl, &bus).run().await;

        assert!(res.is_ok());
        assert_eq!(ctl.ticks(), 3);
        assert!(ctl.done.is_cancelled());
        assert!(ctl.end_of_step.is_set());
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::TickCompleted,
                EventKind::TickCompleted,
                EventKind::TickCompleted,
                EventKind::MachineFinished,
                EventKind::RunStopped,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_step_ends_run_with_error() {
        let bus = Bus::new(64);
        let ctl = Arc::new(RunControl::new(false));
        let mut script = Script::new(10);
        script.fail_at = Some(2);

        let res = worker(script, &ctl, &bus).run().await;

        assert_eq!(res, Err(StepError::fail("step 2")));
        assert_eq!(ctl.ticks(), 2);
        assert!(ctl.end_of_step.is_set());
        assert!(ctl.done.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_step_is_caught() {
        let bus = Bus::new(64);
        let ctl = Arc::new(RunControl::new(false));
        let mut script = Script::new(10);
        script.panic_at = Some(1);

        let res = worker(script, &ctl, &bus).run().await;

        assert_eq!(
            res,
            Err(StepError::Panicked {
                info: "step 1 exploded".into()
            })
        );
        assert!(ctl.done.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_tick_skips_the_machine() {
        let bus = Bus::new(64);
        let ctl = Arc::new(RunControl::new(false));
        ctl.stop.cancel();

        let res = worker(Script::new(5), &ctl, &bus).run().await;

        assert!(res.is_ok());
        assert_eq!(ctl.ticks(), 0);
        assert!(ctl.done.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn start_paused_waits_for_step_request() {
        let bus = Bus::new(64);
        let ctl = Arc::new(RunControl::new(true));
        let handle = tokio::spawn(worker(Script::new(5), &ctl, &bus).run());

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctl.ticks(), 0);

        ctl.step_request.set();
        ctl.step_served.wait_set().await;
        assert!(ctl.end_of_step.is_set());
        assert_eq!(ctl.ticks(), 1);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ctl.ticks(), 1);

        ctl.stop.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(ctl.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn only_a_requested_tick_serves_a_step() {
        let bus = Bus::new(64);
        let ctl = Arc::new(RunControl::new(false));
        // The request lands while a tick the worker was already allowed to run is pending.
        ctl.run.clear();
        ctl.step_request.set();
        let handle = tokio::spawn(worker(Script::new(10), &ctl, &bus).run());

        ctl.step_served.wait_set().await;
        assert_eq!(ctl.ticks(), 2);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ctl.ticks(), 2);
        assert!(!ctl.step_request.is_set());

        ctl.stop.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_ticks_let_forwarder_keep_up() {
        #[derive(Default)]
        struct Count(std::sync::atomic::AtomicU64);

        #[async_trait::async_trait]
        impl Subscribe for Count {
            async fn on_event(&self, ev: &Event) {
                if ev.kind == EventKind::TickCompleted {
                    self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }
        }

        let bus = Bus::new(16);
        let ctl = Arc::new(RunControl::new(false));
        let count = Arc::new(Count::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![count.clone()];
        let set = SubscriberSet::new(&subs, bus.clone());
        let closing = CancellationToken::new();
        let forwarder = tokio::spawn(forward(bus.subscribe(), set, closing.clone()));

        let params = WorkerParams::from(&DriverConfig::with_tick(Duration::ZERO));
        Worker::new(
            Script::new(500),
            Arc::from("script"),
            Arc::clone(&ctl),
            params,
            bus.clone(),
        )
        .run()
        .await
        .unwrap();
        closing.cancel();
        forwarder.await.unwrap();

        assert_eq!(count.0.load(std::sync::atomic::Ordering::SeqCst), 500);
    }
}
