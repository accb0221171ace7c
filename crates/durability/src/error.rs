use std::sync::Arc;

use ramdb_wal::WalError;
use thiserror::Error;

/// Errors surfaced by [`crate::Handle::submit`] and [`crate::Handle::close`].
///
/// Cloneable because a single flush failure is broadcast to every waiter in
/// the failing batch; the underlying [`WalError`] is shared via `Arc`
/// rather than duplicated.
#[derive(Debug, Clone, Error)]
pub enum DurabilityError {
    #[error("wal write failed: {0}")]
    WalWriteFailed(#[source] Arc<WalError>),

    /// Submitted after [`crate::Handle::close`], or after a prior
    /// [`DurabilityError::WalWriteFailed`] put the barrier into a degraded
    /// state that rejects mutations until restart.
    #[error("durable store is closed")]
    Closed,
}

impl From<WalError> for DurabilityError {
    fn from(err: WalError) -> Self {
        DurabilityError::WalWriteFailed(Arc::new(err))
    }
}
