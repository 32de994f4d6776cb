//! Testing utilities for the Docket workspace
//!
//! Shared fixtures, store seeding, and a store wrapper whose reads can be
//! held back to force out-of-order completion.

#![allow(missing_docs)]

use async_trait::async_trait;
use docket_model::{
    DocVersion, GoalItem, Metric, MonthScope, PlanItem, Portfolio, Product, ReleaseGoal,
    ReleaseNote, ReleasePlan, Roadmap,
};
use docket_store::{
    encode_catalog, Catalog, ContextId, DocumentStore, Revision, StoreError, StoreWatch, Stored,
    DEFAULT_CATALOG_KEY,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

pub const PORTFOLIO_ID: &str = "pf-platform";
pub const ATLAS_ID: &str = "p-atlas";
pub const BEACON_ID: &str = "p-beacon";

pub fn april_2025() -> MonthScope {
    MonthScope::new(4, 2025).unwrap()
}

pub fn roadmap(id: &str, year: i32, version: &str) -> Roadmap {
    Roadmap {
        id: id.to_string(),
        year,
        version: DocVersion::parse(version).unwrap(),
        link: format!("https://docs.example.com/roadmaps/{id}"),
        created_at: None,
    }
}

pub fn release_goal(id: &str, scope: MonthScope, version: u64) -> ReleaseGoal {
    ReleaseGoal {
        id: id.to_string(),
        month: scope.month(),
        year: scope.year(),
        version: DocVersion::from_major(version),
        goals: vec![GoalItem {
            id: format!("{id}-g1"),
            description: format!("goal for {id}"),
            current_state: "draft".into(),
            target_state: "shipped".into(),
            status: "on-track".into(),
            owner: "pm".into(),
            priority: "high".into(),
            category: "feature".into(),
        }],
    }
}

pub fn release_plan(id: &str, scope: MonthScope, version: u64) -> ReleasePlan {
    ReleasePlan {
        id: id.to_string(),
        month: scope.month(),
        year: scope.year(),
        version: DocVersion::from_major(version),
        items: vec![PlanItem {
            id: format!("{id}-i1"),
            title: format!("item for {id}"),
            description: String::new(),
            category: "feature".into(),
            priority: "medium".into(),
            source: "roadmap".into(),
            owner: "eng".into(),
            status: "planned".into(),
        }],
    }
}

pub fn release_note(id: &str, scope: MonthScope, version: u64) -> ReleaseNote {
    ReleaseNote {
        id: id.to_string(),
        month: scope.month(),
        year: scope.year(),
        version: DocVersion::from_major(version),
        link: format!("https://docs.example.com/notes/{id}"),
        created_at: None,
    }
}

pub fn metric(
    id: &str,
    scope: MonthScope,
    name: &str,
    value: f64,
    monthly_target: Option<f64>,
) -> Metric {
    Metric {
        id: id.to_string(),
        month: scope.month(),
        year: scope.year(),
        name: name.to_string(),
        value,
        monthly_target,
        annual_target: None,
    }
}

/// Atlas: two April goal versions, roadmaps 1.9 and 1.10 for 2025, no 2024 roadmap
pub fn create_atlas() -> Product {
    let april = april_2025();
    let mut product = Product::new(ATLAS_ID, "Atlas", PORTFOLIO_ID);
    product.roadmap = vec![roadmap("rm-1", 2025, "1.9"), roadmap("rm-2", 2025, "1.10")];
    product.release_goals = vec![release_goal("rg-1", april, 1), release_goal("rg-2", april, 2)];
    product.release_plans = vec![release_plan("rp-1", april, 1)];
    product.release_notes = vec![release_note("rn-1", april, 1)];
    product.metrics = vec![
        metric("m-1", april, "Weekly active users", 1200.0, Some(1000.0)),
        metric("m-2", april, "Crash-free sessions", 98.7, Some(99.5)),
    ];
    product
}

pub fn create_beacon() -> Product {
    Product::new(BEACON_ID, "Beacon", PORTFOLIO_ID)
}

pub fn create_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .insert_portfolio(Portfolio {
            id: PORTFOLIO_ID.to_string(),
            name: "Platform".to_string(),
            product_ids: Vec::new(),
        })
        .unwrap();
    catalog.insert_product(create_atlas()).unwrap();
    catalog.insert_product(create_beacon()).unwrap();
    catalog
}

pub fn create_catalog_json() -> String {
    encode_catalog(&create_catalog()).unwrap()
}

/// Write `catalog` under the default key
pub async fn seed_store(store: &dyn DocumentStore, catalog: &Catalog) -> Revision {
    store
        .put(DEFAULT_CATALOG_KEY, encode_catalog(catalog).unwrap())
        .await
        .unwrap()
}

#[derive(Debug)]
struct HeldRead {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Handle on one held read
#[derive(Debug)]
pub struct ReadGate {
    reached: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl ReadGate {
    /// Wait until the held read has fetched its value
    pub async fn reached(&mut self) {
        let _ = (&mut self.reached).await;
    }

    /// Let the held read return
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Store wrapper that can hold reads back after they fetch
///
/// A held `get` reads the inner store immediately, then waits for its gate
/// before returning, so it resolves with state older than reads issued later.
#[derive(Debug)]
pub struct GatedStore {
    inner: Arc<dyn DocumentStore>,
    held: Mutex<VecDeque<HeldRead>>,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            held: Mutex::new(VecDeque::new()),
        }
    }

    /// Hold the next not-yet-claimed `get`
    pub fn hold_next_read(&self) -> ReadGate {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.held.lock().push_back(HeldRead {
            reached: reached_tx,
            release: release_rx,
        });
        ReadGate {
            reached: reached_rx,
            release: release_tx,
        }
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    fn context_id(&self) -> ContextId {
        self.inner.context_id()
    }

    async fn get(&self, key: &str) -> Result<Option<Stored>, StoreError> {
        let held = self.held.lock().pop_front();
        let value = self.inner.get(key).await;
        if let Some(held) = held {
            let _ = held.reached.send(());
            let _ = held.release.await;
        }
        value
    }

    async fn put(&self, key: &str, value: String) -> Result<Revision, StoreError> {
        self.inner.put(key, value).await
    }

    async fn put_if(
        &self,
        key: &str,
        value: String,
        expected: Revision,
    ) -> Result<Revision, StoreError> {
        self.inner.put_if(key, value, expected).await
    }

    fn watch(&self) -> StoreWatch {
        self.inner.watch()
    }
}
