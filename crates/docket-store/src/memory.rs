//! In-memory shared medium
//!
//! [`MemoryMedium`] stands in for a persisted store shared by several
//! independent contexts (browser tabs over one local store, processes over
//! one file). Each context talks to it through its own [`MemoryStore`].

use crate::error::StoreError;
use crate::store::{ContextId, DocumentStore, Revision, StoreChange, StoreWatch, Stored};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared key-value medium with a cross-context change broadcast
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    inner: Arc<MediumInner>,
}

#[derive(Debug)]
struct MediumInner {
    entries: DashMap<String, Stored>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryMedium {
    /// Create empty medium buffering up to `capacity` unread changes per watcher
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(MediumInner {
                entries: DashMap::new(),
                changes,
            }),
        }
    }

    /// Open a new context on this medium
    #[must_use]
    pub fn open_context(&self) -> MemoryStore {
        let context = ContextId::new();
        tracing::debug!(%context, "opened store context");
        MemoryStore {
            medium: self.clone(),
            context,
        }
    }

    /// Number of keys held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether no key has been written
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of live watchers across all contexts
    #[inline]
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    fn write(
        &self,
        origin: ContextId,
        key: &str,
        value: String,
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError> {
        let revision = match self.inner.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let current = slot.get().revision;
                check_expected(key, expected, current)?;
                let next = current.next();
                slot.insert(Stored {
                    value,
                    revision: next,
                });
                next
            }
            Entry::Vacant(slot) => {
                check_expected(key, expected, Revision::ZERO)?;
                let next = Revision::ZERO.next();
                slot.insert(Stored {
                    value,
                    revision: next,
                });
                next
            }
        };

        let watchers = self.inner.changes.receiver_count();
        tracing::trace!(key, %revision, %origin, watchers, "store write");
        // no watchers is not an error
        let _ = self.inner.changes.send(StoreChange {
            key: key.to_string(),
            revision,
            origin,
        });

        Ok(revision)
    }
}

impl Default for MemoryMedium {
    /// Medium with room for 64 unread changes per watcher
    fn default() -> Self {
        Self::new(64)
    }
}

fn check_expected(
    key: &str,
    expected: Option<Revision>,
    actual: Revision,
) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != actual => Err(StoreError::RevisionConflict {
            key: key.to_string(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// One context's handle on a [`MemoryMedium`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    medium: MemoryMedium,
    context: ContextId,
}

impl MemoryStore {
    /// Standalone store on a fresh private medium
    #[must_use]
    pub fn isolated() -> Self {
        MemoryMedium::default().open_context()
    }

    /// Medium this handle belongs to
    #[inline]
    #[must_use]
    pub fn medium(&self) -> &MemoryMedium {
        &self.medium
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn context_id(&self) -> ContextId {
        self.context
    }

    async fn get(&self, key: &str) -> Result<Option<Stored>, StoreError> {
        Ok(self
            .medium
            .inner
            .entries
            .get(key)
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<Revision, StoreError> {
        self.medium.write(self.context, key, value, None)
    }

    async fn put_if(
        &self,
        key: &str,
        value: String,
        expected: Revision,
    ) -> Result<Revision, StoreError> {
        self.medium.write(self.context, key, value, Some(expected))
    }

    fn watch(&self) -> StoreWatch {
        StoreWatch::new(self.medium.inner.changes.subscribe(), self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreSignal;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::isolated();
        assert_eq!(store.get("k").await.unwrap(), None);

        let rev = store.put("k", "{\"a\":1}".to_string()).await.unwrap();
        let stored = store.get("k").await.unwrap().unwrap();

        assert_eq!(stored.value, "{\"a\":1}");
        assert_eq!(stored.revision, rev);
        assert_eq!(store.revision("k").await.unwrap(), Revision(1));
    }

    #[tokio::test]
    async fn put_if_detects_concurrent_write() {
        let medium = MemoryMedium::default();
        let tab_a = medium.open_context();
        let tab_b = medium.open_context();

        let read = tab_a.put("k", "v1".to_string()).await.unwrap();
        tab_b.put("k", "v2".to_string()).await.unwrap();

        let err = tab_a
            .put_if("k", "v3".to_string(), read)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::RevisionConflict {
                key: "k".to_string(),
                expected: Revision(1),
                actual: Revision(2),
            }
        );
        assert_eq!(tab_a.get("k").await.unwrap().unwrap().value, "v2");
    }

    #[tokio::test]
    async fn put_if_on_absent_key_expects_zero() {
        let store = MemoryStore::isolated();
        assert!(store.put_if("k", "v".into(), Revision(3)).await.is_err());
        assert_eq!(
            store.put_if("k", "v".into(), Revision::ZERO).await.unwrap(),
            Revision(1)
        );
    }

    #[tokio::test]
    async fn writes_reach_other_contexts_only() {
        let medium = MemoryMedium::default();
        let tab_a = medium.open_context();
        let tab_b = medium.open_context();
        let mut watch_a = tab_a.watch();
        let mut watch_b = tab_b.watch();

        tab_a.put("k", "from a".to_string()).await.unwrap();
        tab_b.put("k", "from b".to_string()).await.unwrap();

        match watch_b.recv().await {
            Some(StoreSignal::Changed(change)) => {
                assert_eq!(change.origin, tab_a.context_id());
                assert_eq!(change.revision, Revision(1));
            }
            other => panic!("unexpected signal: {other:?}"),
        }
        match watch_a.recv().await {
            Some(StoreSignal::Changed(change)) => {
                assert_eq!(change.origin, tab_b.context_id());
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn contexts_share_entries() {
        let medium = MemoryMedium::new(4);
        assert!(medium.is_empty());
        let _a = medium.open_context();
        let _b = medium.open_context();
        assert_eq!(medium.len(), 0);
        assert_eq!(medium.watcher_count(), 0);
    }
}
