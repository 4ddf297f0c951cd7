//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into a
//! driver. Each subscriber is driven by a dedicated worker task, fed by a bounded
//! queue owned by the [`SubscriberSet`](crate::SubscriberSet) of the current run.
//!
//! ## Contract
//! - Workers run on the worker thread's runtime. They are polled while the worker
//!   waits (tick budget, paused wait) or yields after a tick that awaited nothing,
//!   never while a step is executing.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use tickvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct OverrunCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for OverrunCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TickOverrun {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "overruns" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Implementations should avoid blocking: a slow subscriber delays the worker's
/// next wake-up on the shared current-thread runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
