//! Update cursor, notification gate and the durable state behind them
//!
//! A check cycle loads the [`cursor::Cursor`], reconciles it against the
//! current catalog, hands every first-seen release to a
//! [`notifier::Notifier`] and persists the advanced cursor.
//!
//! # Modules
//!
//! - [`cursor`]: Watermark plus last-reported snapshot, and the pure reconcile step
//! - [`cycle`]: The check cycle orchestration
//! - [`notifier`]: Notice rendering and delivery
//! - [`store`]: SQLite-backed flag store, notice inbox and single-flight lock
//! - [`error`]: Error types for store, notifier and cycle failures

pub mod cursor;
pub mod cycle;
pub mod error;
pub mod notifier;
pub mod store;
