//! # Runtime Adapters
//!
//! Port implementations that only make sense inside the runtime binary. The
//! member directory and formatter come from `relay_core::adapters`.

mod console_transport;

pub use console_transport::ConsoleTransport;
