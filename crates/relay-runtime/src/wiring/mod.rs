//! # Wiring
//!
//! Background tasks that keep the relay healthy.
//!
//! ```text
//! every spam.interval        ──→ RelayApi::decay_scores
//! every cache.expire_interval ──→ RelayApi::expire_cache
//! ```
//!
//! All tasks stop when the shutdown channel flips to `true`.

pub mod maintenance;

pub use maintenance::{spawn_maintenance, spawn_periodic};
