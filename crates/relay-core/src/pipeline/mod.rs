//! # Delivery Pipeline
//!
//! Fixed pool of workers draining one shared job queue. Each worker paces its
//! sends with its own [`RateGate`], so the pool as a whole stays within the
//! configured calls-per-second budget.
//!
//! ## Job lifecycle
//!
//! ```text
//! Queued ──→ (ledger live?) ──no──→ Cancelled
//!              │ yes
//!              ↓
//!          rate gate ──→ Sending ──ok──→ Delivered (mapping recorded, ledger advanced)
//!              ↑            │
//!              └─Throttled──┤ (sleep retry_after, re-check ledger)
//!                           └─error──→ Failed (ledger advanced)
//! ```

mod rate_gate;
mod worker;

pub use rate_gate::RateGate;
pub use worker::*;

use shared_types::{CopyId, RecipientId};
use tracing::warn;

use crate::ports::outbound::{Transport, TransportError};

/// Retract a copy, waiting out any throttling.
pub async fn retract_with_retry<T: Transport + ?Sized>(
    transport: &T,
    recipient: RecipientId,
    copy: CopyId,
) -> Result<(), TransportError> {
    loop {
        match transport.retract(recipient, copy).await {
            Err(TransportError::RateLimited { retry_after }) => {
                warn!(
                    "[pipeline] Throttled retracting copy {} for {}, retrying in {:?}",
                    copy, recipient, retry_after
                );
                tokio::time::sleep(retry_after).await;
            }
            result => return result,
        }
    }
}
