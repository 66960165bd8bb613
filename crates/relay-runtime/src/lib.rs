//! # Relay Runtime Library
//!
//! Exposes the runtime's modules for testing. The entry point is the
//! `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - configuration and service construction
//! - `adapters/` - console transport standing in for the chat platform
//! - `wiring/` - maintenance schedules
//! - `console` - line-based command driver
//! - `runtime` - startup and graceful shutdown

pub mod adapters;
pub mod console;
pub mod container;
pub mod runtime;
pub mod wiring;

pub use container::{ConfigError, RelayContainer, RuntimeConfig};
pub use runtime::RelayRuntime;
