//! Shared utilities for use cases.

use tokio_util::sync::CancellationToken;

/// Marker for an observed cancellation; converted into each use case's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Check if cancellation has been requested.
pub(crate) fn check_cancelled<E: From<Cancelled>>(token: &CancellationToken) -> Result<(), E> {
    if token.is_cancelled() {
        return Err(E::from(Cancelled));
    }
    Ok(())
}
