//! # Domain Layer for the Relay
//!
//! Synchronous, lock-owning components with no I/O.
//!
//! ## Contents
//!
//! - **roster**: ordered, deduplicated set of recipients (`RecipientRoster`)
//! - **relay_cache**: canonical messages and per-recipient copy mappings (`RelayCache`)
//! - **ledger**: fan-out completion tracking (`BroadcastLedger`)
//! - **scorekeeper**: decaying spam scores (`SpamScorekeeper`)
//! - **admission**: profile and content policy checks
//! - **services**: spam cost and cooldown schedule
//! - **value_objects**: configuration
//!
//! Every component guards its own state. None of them calls into another, so
//! no lock is ever taken while another component's lock is held.

mod admission;
mod entities;
mod ledger;
mod relay_cache;
mod roster;
mod scorekeeper;
mod services;
mod value_objects;

pub use admission::*;
pub use entities::*;
pub use ledger::*;
pub use relay_cache::*;
pub use roster::*;
pub use scorekeeper::*;
pub use services::*;
pub use value_objects::*;
