//! # Relay Core
//!
//! Relays each inbound channel message to every other active member under a
//! per-recipient copy id, and keeps enough bookkeeping to moderate every copy
//! afterwards.
//!
//! ## Architecture Role
//!
//! ```text
//! [Platform client] ──InboundMessage──→ [RelayService]
//!                                           │ admission (profile, content, spam)
//!                                           ↓
//!                                      [RelayCache] assigns CanonicalId
//!                                           │
//!                                           ↓ one DeliveryJob per recipient
//!                                   [DeliveryPipeline] W workers, rate gated
//!                                   ┌───────┴───────┐
//!                                   ↓               ↓
//!                              [Member B]      [Member C] ...
//! ```
//!
//! Moderation (delete, warn, upvote) is keyed by `CanonicalId` and reaches
//! every delivered copy through the cache mapping.

pub mod adapters;
pub mod domain;
pub mod events;
pub mod pipeline;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::*;
pub use events::RelayError;
pub use ports::inbound::RelayApi;
pub use service::RelayService;
