//! Error types for view reconciliation

use docket_store::LoadError;

/// Reconciliation errors
///
/// Missing and malformed aggregates are not errors here; they move the view
/// to `ViewPhase::NotFound`.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The store could not be read; the previous phase is kept
    #[error("reload failed: {0}")]
    Load(#[source] LoadError),
}

impl ViewError {
    /// Whether retrying the reload may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Load(err) => err.is_retryable(),
        }
    }
}
