//! Ports for the relay.
//!
//! - **inbound**: [`RelayApi`](inbound::RelayApi), what the platform glue calls
//! - **outbound**: transport, user directory, formatter, notifier, clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
