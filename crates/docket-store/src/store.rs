//! Document store seam
//!
//! Provides the [`DocumentStore`] trait consumers hold instead of reaching
//! into ambient globals, plus the revision and change types it speaks.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use tokio::sync::broadcast;
use ulid::Ulid;

/// Per-key write counter
///
/// `Revision::ZERO` means the key has never been written.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision of an absent key
    pub const ZERO: Self = Self(0);

    /// Revision after one more write
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Whether the key has never been written
    #[inline]
    #[must_use]
    pub fn is_absent(self) -> bool {
        self.0 == 0
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Identity of one execution context (a tab, a window, a process)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(pub Ulid);

impl ContextId {
    /// Generate new context ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ContextId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized value with the revision it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    /// Opaque JSON text
    pub value: String,
    /// Revision of this value
    pub revision: Revision,
}

/// A write observed on the shared medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Key that was written
    pub key: String,
    /// Revision produced by the write
    pub revision: Revision,
    /// Context that performed the write
    pub origin: ContextId,
}

/// What a [`StoreWatch`] yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSignal {
    /// Another context wrote a key
    Changed(StoreChange),
    /// The receiver fell behind and missed this many changes
    Lagged(u64),
}

/// Cross-context change stream for one context
///
/// Writes made by the watching context itself are skipped; those are only
/// announced on the in-context channel.
#[derive(Debug)]
pub struct StoreWatch {
    rx: broadcast::Receiver<StoreChange>,
    own: ContextId,
}

impl StoreWatch {
    /// Wrap a raw change receiver for the given context
    #[inline]
    #[must_use]
    pub fn new(rx: broadcast::Receiver<StoreChange>, own: ContextId) -> Self {
        Self { rx, own }
    }

    /// Next change made by another context
    ///
    /// Returns `None` once the medium is gone.
    pub async fn recv(&mut self) -> Option<StoreSignal> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.origin == self.own => {}
                Ok(change) => return Some(StoreSignal::Changed(change)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Some(StoreSignal::Lagged(missed));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Key-value store of opaque JSON documents
///
/// Reads must be side-effect free. Every successful write is broadcast to
/// the other contexts sharing the medium.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Context this handle writes as
    fn context_id(&self) -> ContextId;

    /// Read a key
    ///
    /// # Errors
    /// Returns `StoreError` if the medium cannot be read
    async fn get(&self, key: &str) -> Result<Option<Stored>, StoreError>;

    /// Unconditional write (last write wins)
    ///
    /// # Errors
    /// Returns `StoreError` if the medium cannot be written
    async fn put(&self, key: &str, value: String) -> Result<Revision, StoreError>;

    /// Write only if the key is still at `expected`
    ///
    /// # Errors
    /// Returns `StoreError::RevisionConflict` if another write landed first
    async fn put_if(
        &self,
        key: &str,
        value: String,
        expected: Revision,
    ) -> Result<Revision, StoreError>;

    /// Current revision of a key, to ask "has this changed since I read it"
    ///
    /// # Errors
    /// Returns `StoreError` if the medium cannot be read
    async fn revision(&self, key: &str) -> Result<Revision, StoreError> {
        Ok(self
            .get(key)
            .await?
            .map_or(Revision::ZERO, |stored| stored.revision))
    }

    /// Subscribe to writes made by other contexts
    fn watch(&self) -> StoreWatch;
}
