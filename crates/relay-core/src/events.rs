//! Error types for the relay.

use shared_types::CanonicalId;
use thiserror::Error;

use crate::domain::{AdmissionRejected, CacheError};
use crate::ports::outbound::{DirectoryError, TransportError};

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message rejected: {0}")]
    Admission(#[from] AdmissionRejected),

    /// The message expired or was deleted: nothing left to act on.
    #[error("Message {0} is no longer cached")]
    NotFound(CanonicalId),

    #[error("Message {0} has already been warned for")]
    AlreadyWarned(CanonicalId),

    #[error("Relay cache error: {0}")]
    Cache(CacheError),

    #[error("User directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<CacheError> for RelayError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::CanonicalNotFound(id) => RelayError::NotFound(id),
            other => RelayError::Cache(other),
        }
    }
}

impl RelayError {
    /// The target message can no longer be acted on.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RelayError::NotFound(_)
                | RelayError::Cache(CacheError::CopyNotFound { .. })
                | RelayError::Cache(CacheError::RecipientUnknown(_))
        )
    }
}
