//! # Shared Types Crate
//!
//! Cross-crate types for the anonymous relay.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers and the inbound message shape are
//!   defined once here and reused by `relay-core`, `relay-runtime` and the
//!   test suite.
//! - **Opaque identifiers**: a [`CopyId`] is only meaningful together with the
//!   [`RecipientId`] whose chat it lives in.

pub mod entities;
pub mod profile;

pub use entities::*;
pub use profile::*;
