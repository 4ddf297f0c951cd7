//! # Boolean cross-thread signal.
//!
//! [`Signal`] is a settable/clearable flag with an async wait, built on
//! [`tokio::sync::watch`]. A waiter checks the current value before suspending, so a
//! `set` issued before the wait starts is never missed. Set and clear never block and
//! work from any thread, inside or outside a runtime.

use tokio::sync::watch;

/// Settable flag with a wait-until-set operation.
#[derive(Debug)]
pub(crate) struct Signal {
    tx: watch::Sender<bool>,
}

impl Signal {
    pub(crate) fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Sets the flag and returns whether it was already set.
    pub(crate) fn set(&self) -> bool {
        self.tx.send_replace(true)
    }

    /// Clears the flag and returns whether it was set.
    pub(crate) fn clear(&self) -> bool {
        self.tx.send_replace(false)
    }

    pub(crate) fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once the flag is set (immediately if it already is).
    pub(crate) async fn wait_set(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|set| *set).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn set_and_clear_report_previous_value() {
        let s = Signal::new(true);
        assert!(s.clear());
        assert!(!s.is_set());
        assert!(!s.clear());
        assert!(!s.set());
        assert!(s.set());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_set() {
        let s = Signal::new(false);
        s.set();
        tokio::time::timeout(Duration::from_secs(1), s.wait_set())
            .await
            .expect("already set");
    }

    #[test]
    fn set_from_other_thread_wakes_waiter() {
        let s = Arc::new(Signal::new(false));
        let setter = Arc::clone(&s);
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            setter.set();
        });
        futures::executor::block_on(s.wait_set());
        assert!(s.is_set());
        t.join().unwrap();
    }
}
