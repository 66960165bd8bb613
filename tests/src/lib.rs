//! # Anonymous Relay Test Suite
//!
//! Cross-crate scenarios: the relay service with its delivery pipeline,
//! the maintenance schedule, and the console runtime.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs      # Fixture with recording doubles
//!     ├── flows.rs        # Fan-out, throttling, cancellation
//!     ├── moderation.rs   # Delete, warn, upvote
//!     ├── spam.rs         # Burst limits and decay
//!     └── console.rs      # Runtime behind the console driver
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo test -p relay-tests integration::moderation::
//! ```

pub mod integration;
