//! View-state reconciler
//!
//! One reconciler per mounted consumer. It owns the consumer's target
//! (product id and period), the last loaded aggregate and the published
//! [`ViewPhase`]. Every notice re-runs the full pipeline from a fresh read:
//! load, filter, select and derive. A period change re-derives from the held
//! aggregate without touching the store.
//!
//! Reloads may overlap. Each is stamped by a [`RequestSequence`] and only the
//! most recently issued one is applied.

use crate::error::ViewError;
use crate::sequence::{RequestSequence, RequestStamp};
use crate::state::{VersionPins, ViewPhase, ViewState};
use docket_model::{DocVersion, DocumentKind, Period};
use docket_store::{AggregateLoader, ChangeNotice, ChangeSubscriber, LoadError, ProductAggregate};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What a reload or notice did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Fresh state was published
    Applied,
    /// The target is absent; the view is now `NotFound`
    NotFound,
    /// A later reload was issued first; this result was dropped
    Superseded,
    /// Nothing to do (no target, terminal phase, or a notice for another product)
    Skipped,
}

#[derive(Debug)]
struct Target {
    product_id: Option<String>,
    period: Period,
    pins: VersionPins,
    aggregate: Option<Arc<ProductAggregate>>,
}

/// Keeps one consumer's derived view consistent with the store
#[derive(Debug)]
pub struct Reconciler {
    loader: AggregateLoader,
    sequence: RequestSequence,
    target: Mutex<Target>,
    phase: watch::Sender<ViewPhase>,
}

impl Reconciler {
    /// Create an unmounted reconciler showing `period`
    #[must_use]
    pub fn new(loader: AggregateLoader, period: Period) -> Self {
        let (phase, _) = watch::channel(ViewPhase::Loading);
        Self {
            loader,
            sequence: RequestSequence::new(),
            target: Mutex::new(Target {
                product_id: None,
                period,
                pins: VersionPins::new(),
                aggregate: None,
            }),
            phase,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ViewPhase {
        self.phase.borrow().clone()
    }

    /// Observe phase changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewPhase> {
        self.phase.subscribe()
    }

    /// Product currently targeted
    #[must_use]
    pub fn product_id(&self) -> Option<String> {
        self.target.lock().product_id.clone()
    }

    /// Period currently shown
    #[must_use]
    pub fn period(&self) -> Period {
        self.target.lock().period
    }

    /// Initial load for a product
    ///
    /// # Errors
    /// Returns `ViewError::Load` if the store cannot be read
    pub async fn mount(&self, product_id: &str) -> Result<ReloadOutcome, ViewError> {
        tracing::debug!(product_id, "mount");
        self.navigate(product_id).await
    }

    /// Switch to another product, restarting at `Loading`
    ///
    /// This is the only way out of `NotFound`.
    ///
    /// # Errors
    /// Returns `ViewError::Load` if the store cannot be read
    pub async fn navigate(&self, product_id: &str) -> Result<ReloadOutcome, ViewError> {
        let stamp = {
            let mut target = self.target.lock();
            target.product_id = Some(product_id.to_string());
            target.pins.clear();
            target.aggregate = None;
            self.publish(ViewPhase::Loading);
            self.sequence.issue()
        };
        self.reload(product_id.to_string(), stamp).await
    }

    /// Show another period of the held aggregate
    ///
    /// Never reads the store. While a load is pending the new period is
    /// picked up when it resolves.
    pub fn set_period(&self, period: Period) {
        let mut target = self.target.lock();
        if target.period == period {
            return;
        }
        target.period = period;
        target.pins.clear();
        tracing::debug!(%period, "period changed");
        self.rederive(&target);
    }

    /// Show a specific version of one collection instead of the latest
    ///
    /// Cleared on period change and navigation.
    pub fn pin_version(&self, kind: DocumentKind, version: DocVersion) {
        let mut target = self.target.lock();
        target.pins.pin(kind, version);
        self.rederive(&target);
    }

    /// Return a collection to its latest version
    pub fn unpin_version(&self, kind: DocumentKind) {
        let mut target = self.target.lock();
        if target.pins.unpin(kind).is_some() {
            self.rederive(&target);
        }
    }

    /// Re-read the aggregate and re-derive
    ///
    /// Skipped when unmounted or in `NotFound`.
    ///
    /// # Errors
    /// Returns `ViewError::Load` if the store cannot be read
    pub async fn refresh(&self) -> Result<ReloadOutcome, ViewError> {
        let (product_id, stamp) = {
            let target = self.target.lock();
            let Some(product_id) = target.product_id.clone() else {
                return Ok(ReloadOutcome::Skipped);
            };
            if self.phase.borrow().is_not_found() {
                return Ok(ReloadOutcome::Skipped);
            }
            (product_id, self.sequence.issue())
        };
        self.reload(product_id, stamp).await
    }

    /// React to a change notice
    ///
    /// # Errors
    /// Returns `ViewError::Load` if the store cannot be read
    pub async fn on_notice(&self, notice: &ChangeNotice) -> Result<ReloadOutcome, ViewError> {
        let concerned = self
            .target
            .lock()
            .product_id
            .as_deref()
            .is_some_and(|id| notice.concerns(id));
        if !concerned {
            return Ok(ReloadOutcome::Skipped);
        }
        tracing::debug!(origin = ?notice.origin, key = ?notice.key, "change notice");
        self.refresh().await
    }

    /// Refresh on every notice until the subscriber's stream ends
    ///
    /// The task re-reads once before waiting for notices, so a write that
    /// landed between the last load and `subscriber` being created is still
    /// picked up. It holds the reconciler weakly and exits at the first
    /// notice after the last strong reference is gone; `abort()` the handle
    /// on unmount to stop it immediately.
    pub fn listen(self: &Arc<Self>, mut subscriber: ChangeSubscriber) -> JoinHandle<()> {
        let this = Arc::downgrade(self);
        tokio::spawn(async move {
            if let Some(reconciler) = this.upgrade() {
                if let Err(err) = reconciler.refresh().await {
                    log_failed_refresh(&err);
                }
            }

            while let Some(notice) = subscriber.recv().await {
                let Some(reconciler) = this.upgrade() else {
                    tracing::debug!("reconciler dropped, listener exiting");
                    return;
                };
                if let Err(err) = reconciler.on_notice(&notice).await {
                    log_failed_refresh(&err);
                }
            }
            tracing::debug!("notice stream closed");
        })
    }

    async fn reload(
        &self,
        product_id: String,
        stamp: RequestStamp,
    ) -> Result<ReloadOutcome, ViewError> {
        tracing::debug!(%product_id, %stamp, "reload");
        let result = self.loader.load(&product_id).await;

        let mut target = self.target.lock();
        if !self.sequence.is_latest(stamp) {
            tracing::debug!(%product_id, %stamp, "discarding superseded reload");
            return Ok(ReloadOutcome::Superseded);
        }

        match result {
            Ok(aggregate) => {
                target.aggregate = Some(Arc::new(aggregate));
                self.rederive(&target);
                Ok(ReloadOutcome::Applied)
            }
            Err(err) if err.is_not_found() => {
                if matches!(err, LoadError::Malformed(_)) {
                    tracing::warn!(
                        %product_id,
                        error = %err,
                        "treating malformed aggregate as not found"
                    );
                }
                target.aggregate = None;
                self.publish(ViewPhase::NotFound);
                Ok(ReloadOutcome::NotFound)
            }
            Err(err) => {
                tracing::warn!(%product_id, error = %err, "reload failed, keeping current view");
                Err(ViewError::Load(err))
            }
        }
    }

    fn rederive(&self, target: &Target) {
        if let Some(aggregate) = &target.aggregate {
            let state = ViewState::derive(aggregate, target.period, &target.pins);
            self.publish(ViewPhase::Ready(Arc::new(state)));
        }
    }

    fn publish(&self, phase: ViewPhase) {
        tracing::debug!(phase = phase.name(), "view phase");
        self.phase.send_replace(phase);
    }
}

fn log_failed_refresh(err: &ViewError) {
    tracing::warn!(
        error = %err,
        retryable = err.is_retryable(),
        "refresh after notice failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_model::{MonthScope, Product, ReleaseGoal};
    use docket_store::{
        encode_catalog, Catalog, ChangeBus, DocumentStore, MemoryStore, NoticeOrigin, Signal,
        DEFAULT_CATALOG_KEY,
    };

    fn goal(id: &str, month: u8, version: u64) -> ReleaseGoal {
        ReleaseGoal {
            id: id.into(),
            month,
            year: 2025,
            version: DocVersion::from_major(version),
            goals: Vec::new(),
        }
    }

    async fn seeded() -> (Arc<MemoryStore>, Reconciler) {
        let store = Arc::new(MemoryStore::isolated());
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product.release_goals = vec![goal("a1", 4, 1), goal("a2", 4, 2), goal("m1", 5, 1)];
        let mut catalog = Catalog::new();
        catalog.insert_product(product).unwrap();
        catalog.insert_product(Product::new("p-2", "Beacon", "pf-1")).unwrap();
        store
            .put(DEFAULT_CATALOG_KEY, encode_catalog(&catalog).unwrap())
            .await
            .unwrap();

        let loader = AggregateLoader::new(store.clone(), DEFAULT_CATALOG_KEY);
        let reconciler = Reconciler::new(loader, MonthScope::new(4, 2025).unwrap());
        (store, reconciler)
    }

    fn selected_goal(reconciler: &Reconciler) -> Option<String> {
        reconciler
            .phase()
            .state()
            .and_then(|s| s.release_goal.as_ref().map(|g| g.id.clone()))
    }

    #[tokio::test]
    async fn mount_moves_to_ready() {
        let (_store, reconciler) = seeded().await;
        assert_eq!(reconciler.phase(), ViewPhase::Loading);

        let outcome = reconciler.mount("p-1").await.unwrap();
        assert_eq!(outcome, ReloadOutcome::Applied);
        assert_eq!(selected_goal(&reconciler).as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn unknown_product_is_terminal_until_navigate() {
        let (_store, reconciler) = seeded().await;
        assert_eq!(reconciler.mount("nope").await.unwrap(), ReloadOutcome::NotFound);
        assert!(reconciler.phase().is_not_found());

        assert_eq!(reconciler.refresh().await.unwrap(), ReloadOutcome::Skipped);
        assert!(reconciler.phase().is_not_found());

        reconciler.navigate("p-2").await.unwrap();
        assert_eq!(reconciler.phase().state().unwrap().product_name, "Beacon");
    }

    #[tokio::test]
    async fn set_period_rederives_without_reading() {
        let (store, reconciler) = seeded().await;
        reconciler.mount("p-1").await.unwrap();

        // an unannounced write is not picked up by a period change
        store.put(DEFAULT_CATALOG_KEY, "{}".into()).await.unwrap();
        reconciler.set_period(MonthScope::new(5, 2025).unwrap());

        assert_eq!(selected_goal(&reconciler).as_deref(), Some("m1"));
        assert_eq!(reconciler.period(), MonthScope::new(5, 2025).unwrap());
    }

    #[tokio::test]
    async fn pins_select_older_versions_until_period_change() {
        let (_store, reconciler) = seeded().await;
        reconciler.mount("p-1").await.unwrap();

        reconciler.pin_version(DocumentKind::ReleaseGoal, DocVersion::from_major(1));
        assert_eq!(selected_goal(&reconciler).as_deref(), Some("a1"));

        reconciler.set_period(MonthScope::new(5, 2025).unwrap());
        reconciler.set_period(MonthScope::new(4, 2025).unwrap());
        assert_eq!(selected_goal(&reconciler).as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn notices_for_other_products_are_skipped() {
        let (_store, reconciler) = seeded().await;
        reconciler.mount("p-1").await.unwrap();

        let other = ChangeNotice::from(Signal::product_data_updated("p-2"));
        assert_eq!(reconciler.on_notice(&other).await.unwrap(), ReloadOutcome::Skipped);

        let resync = ChangeNotice::resync(NoticeOrigin::CrossContext);
        assert_eq!(reconciler.on_notice(&resync).await.unwrap(), ReloadOutcome::Applied);
    }

    #[tokio::test]
    async fn malformed_store_content_reads_as_not_found() {
        let (store, reconciler) = seeded().await;
        reconciler.mount("p-1").await.unwrap();

        store.put(DEFAULT_CATALOG_KEY, "{oops".into()).await.unwrap();
        assert_eq!(reconciler.refresh().await.unwrap(), ReloadOutcome::NotFound);
        assert!(reconciler.phase().is_not_found());
    }

    #[tokio::test]
    async fn listen_refreshes_until_stream_closes() {
        let (store, reconciler) = seeded().await;
        let reconciler = Arc::new(reconciler);
        reconciler.mount("p-1").await.unwrap();

        let bus = ChangeBus::new(8);
        let mut phases = reconciler.subscribe();
        phases.borrow_and_update();
        let handle = reconciler.listen(bus.subscribe(store.as_ref()));

        bus.publish(Signal::product_data_updated("p-1"));
        phases.changed().await.unwrap();
        assert!(phases.borrow().is_ready());

        drop(bus);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn listener_exits_once_reconciler_is_dropped() {
        let (store, reconciler) = seeded().await;
        let reconciler = Arc::new(reconciler);
        reconciler.mount("p-1").await.unwrap();

        let bus = ChangeBus::new(8);
        let handle = reconciler.listen(bus.subscribe(store.as_ref()));
        drop(reconciler);

        // the bus stays open; only the dropped reconciler ends the task
        bus.publish(Signal::product_data_updated("p-1"));
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("listener outlived its reconciler")
            .unwrap();
    }
}
