use ramdb_durability::DurabilityError;
use thiserror::Error;

/// Errors surfaced by the facade and executor, restricted to the subset
/// these components can actually produce. Parse and unknown-command errors
/// never reach this crate: a malformed or unrecognized request never
/// becomes a [`crate::Command`] in the first place (ingress adapters own
/// that rejection).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("wal write failed: {0}")]
    WalWriteFailed(#[source] DurabilityError),

    #[error("store is closed")]
    Closed,
}

impl From<DurabilityError> for StoreError {
    fn from(err: DurabilityError) -> Self {
        match err {
            DurabilityError::Closed => StoreError::Closed,
            other => StoreError::WalWriteFailed(other),
        }
    }
}
