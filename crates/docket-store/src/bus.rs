//! Change notification bus
//!
//! Merges the two ways a consumer learns that stored documents may have
//! changed:
//!
//! - **in-context**: named signals a writer dispatches right after its own
//!   successful write ([`ChangeBus::publish`])
//! - **cross-context**: the store's broadcast of writes made by other
//!   contexts ([`DocumentStore::watch`])
//!
//! Both arrive as a [`ChangeNotice`]. A notice is never a diff; receivers
//! re-derive their state from a fresh read.

use crate::store::{DocumentStore, StoreSignal, StoreWatch};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Name of the product data signal
pub const PRODUCT_DATA_UPDATED: &str = "productDataUpdated";

/// Named in-context signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum Signal {
    /// Product documents were written
    #[serde(rename_all = "camelCase")]
    ProductDataUpdated {
        /// Affected product, when known
        product_id: Option<String>,
    },
}

impl Signal {
    /// Signal for one product
    #[inline]
    pub fn product_data_updated(product_id: impl Into<String>) -> Self {
        Self::ProductDataUpdated {
            product_id: Some(product_id.into()),
        }
    }

    /// Signal for an unknown set of products
    #[inline]
    #[must_use]
    pub fn catalog_updated() -> Self {
        Self::ProductDataUpdated { product_id: None }
    }

    /// Signal name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProductDataUpdated { .. } => PRODUCT_DATA_UPDATED,
        }
    }

    /// Product the signal is about, if any
    #[inline]
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        match self {
            Self::ProductDataUpdated { product_id } => product_id.as_deref(),
        }
    }
}

/// Channel a notice arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOrigin {
    /// Dispatched by a writer in this context
    InContext,
    /// Observed from another context's write
    CrossContext,
}

/// "State may have changed, re-read"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    /// Channel the notice came from
    pub origin: NoticeOrigin,
    /// Affected product, when the channel carries it
    pub product_id: Option<String>,
    /// Store key written, for cross-context notices
    pub key: Option<String>,
}

impl ChangeNotice {
    /// Notice that carries no detail, e.g. after missed signals
    #[inline]
    #[must_use]
    pub fn resync(origin: NoticeOrigin) -> Self {
        Self {
            origin,
            product_id: None,
            key: None,
        }
    }

    /// Whether a consumer showing `product_id` must re-derive
    ///
    /// Only an explicit, different product id rules a notice out.
    #[inline]
    #[must_use]
    pub fn concerns(&self, product_id: &str) -> bool {
        self.product_id.as_deref().map_or(true, |id| id == product_id)
    }
}

impl From<Signal> for ChangeNotice {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::ProductDataUpdated { product_id } => Self {
                origin: NoticeOrigin::InContext,
                product_id,
                key: None,
            },
        }
    }
}

/// In-context signal channel for one execution context
///
/// Cheap to clone; clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Signal>,
}

impl ChangeBus {
    /// Create bus buffering up to `capacity` unread signals per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Dispatch a signal to every subscriber in this context
    ///
    /// Dropped silently when nobody is listening.
    pub fn publish(&self, signal: Signal) {
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            signal = signal.name(),
            product_id = signal.product_id(),
            subscriber_count,
            "ChangeBus publish"
        );
        let _ = self.tx.send(signal);
    }

    /// Subscribe to both channels for a consumer reading through `store`
    #[must_use]
    pub fn subscribe(&self, store: &dyn DocumentStore) -> ChangeSubscriber {
        ChangeSubscriber {
            local: self.tx.subscribe(),
            cross: store.watch(),
            cross_open: true,
        }
    }

    /// Number of active subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Merged notice stream for one consumer
#[derive(Debug)]
pub struct ChangeSubscriber {
    local: broadcast::Receiver<Signal>,
    cross: StoreWatch,
    cross_open: bool,
}

impl ChangeSubscriber {
    /// Next notice from either channel
    ///
    /// Missed signals surface as a detail-free notice rather than an error.
    /// Returns `None` once the in-context bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeNotice> {
        loop {
            tokio::select! {
                local = self.local.recv() => {
                    return match local {
                        Ok(signal) => Some(signal.into()),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(missed, "in-context notices lagged");
                            Some(ChangeNotice::resync(NoticeOrigin::InContext))
                        }
                        Err(broadcast::error::RecvError::Closed) => None,
                    };
                }
                cross = self.cross.recv(), if self.cross_open => {
                    match cross {
                        Some(StoreSignal::Changed(change)) => {
                            return Some(ChangeNotice {
                                origin: NoticeOrigin::CrossContext,
                                product_id: None,
                                key: Some(change.key),
                            });
                        }
                        Some(StoreSignal::Lagged(missed)) => {
                            tracing::warn!(missed, "cross-context notices lagged");
                            return Some(ChangeNotice::resync(NoticeOrigin::CrossContext));
                        }
                        None => self.cross_open = false,
                    }
                }
            }
        }
    }
}
