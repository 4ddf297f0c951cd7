//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes events to multiple subscribers
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Isolation**: a panicking subscriber is reported and keeps receiving events
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! A set lives for exactly one run. [`forward`] drains the bus into it and shuts it down
//! when the run's worker is about to exit.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::panic_info;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: &[Arc<dyn Subscribe>], bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        bus_for_worker
                            .publish(Event::subscriber_panicked(s.name(), panic_info(&*payload)));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// - Uses `try_send` (non-blocking)
    /// - On queue full or closed: drops event, publishes `SubscriberOverflow`
    /// - `SubscriberOverflow` events are not re-published if they themselves overflow
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Forwards bus events into `set` until `closing` is cancelled.
///
/// On close, events already queued on the bus are drained into the set before its
/// workers are shut down, so events published by the exiting worker still reach
/// subscribers. Events lost to a lagging receiver are reported to the set as a single
/// `SubscriberOverflow` carrying the number missed.
pub(crate) async fn forward(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    closing: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => set.emit_arc(Arc::new(ev)),
                Err(RecvError::Lagged(n)) => set.emit_arc(Arc::new(Event::bus_lagged(n))),
                Err(RecvError::Closed) => break,
            },
            _ = closing.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit_arc(Arc::new(ev)),
                        Err(TryRecvError::Lagged(n)) => {
                            set.emit_arc(Arc::new(Event::bus_lagged(n)));
                        }
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    set.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber blew up");
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn forward_drains_queued_events_on_close() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone()];
        let set = SubscriberSet::new(&subs, bus.clone());

        let rx = bus.subscribe();
        bus.publish(Event::new(EventKind::RunStarting));
        bus.publish(Event::new(EventKind::TickCompleted));
        bus.publish(Event::new(EventKind::RunStopped));

        let closing = CancellationToken::new();
        closing.cancel();
        forward(rx, set, closing).await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::RunStarting,
                EventKind::TickCompleted,
                EventKind::RunStopped
            ]
        );
    }

    #[tokio::test]
    async fn lagging_receiver_reports_overflow_to_subscribers() {
        let bus = Bus::new(2);
        let rec = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone()];
        let set = SubscriberSet::new(&subs, bus.clone());

        let rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(Event::new(EventKind::TickCompleted));
        }

        let closing = CancellationToken::new();
        closing.cancel();
        forward(rx, set, closing).await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![
                EventKind::SubscriberOverflow,
                EventKind::TickCompleted,
                EventKind::TickCompleted
            ]
        );
    }

    #[tokio::test]
    async fn panicking_subscriber_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicky)];
        let set = SubscriberSet::new(&subs, bus.clone());

        set.emit_arc(Arc::new(Event::new(EventKind::TickCompleted)));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.machine.as_deref(), Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber blew up"));
    }

    #[tokio::test]
    async fn full_queue_reports_overflow() {
        struct Tiny;

        #[async_trait]
        impl Subscribe for Tiny {
            async fn on_event(&self, _ev: &Event) {}
            fn name(&self) -> &'static str {
                "tiny"
            }
            fn queue_capacity(&self) -> usize {
                1
            }
        }

        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Tiny)];
        let set = SubscriberSet::new(&subs, bus.clone());

        // The worker is not polled between these two calls on a current-thread runtime.
        set.emit_arc(Arc::new(Event::new(EventKind::TickCompleted)));
        set.emit_arc(Arc::new(Event::new(EventKind::TickCompleted)));

        let ev = rx.recv().await.unwrap();
        assert!(ev.is_subscriber_overflow());
        set.shutdown().await;
    }
}
