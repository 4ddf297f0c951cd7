//! # Event subscribers for the tickvisor driver.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and,
//! behind the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow (per run):
//!   Driver / worker ── publish(Event) ──► Bus ──► forward() ──► SubscriberSet
//!                                                                   │
//!                                                     ┌─────────────┼──────────┐
//!                                                     ▼             ▼          ▼
//!                                                 LogWriter      Metrics    Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::forward;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
