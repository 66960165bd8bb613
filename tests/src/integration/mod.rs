//! # Integration Scenarios
//!
//! - `flows`: admission, fan-out, throttling, cancellation
//! - `moderation`: delete, warn, upvote across every delivered copy
//! - `spam`: burst rejection and recovery through scheduled decay
//! - `console`: the runtime wired end to end behind the console driver

#[cfg(test)]
pub mod support;

mod flows;
mod moderation;
mod spam;
