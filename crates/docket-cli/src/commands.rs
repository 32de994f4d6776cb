//! Subcommand implementations
//!
//! A catalog file is loaded into an in-memory context, worked on through the
//! same loader, writer and reconciler a long-lived consumer would use, and
//! written back only after a successful publish.

use crate::render::{render_catalog, render_view};
use anyhow::{anyhow, bail, Context, Result};
use docket_model::{DocumentKind, GoalItem, MonthScope, PlanItem, YearScope};
use docket_store::{
    AggregateLoader, ChangeBus, DocketConfig, DocumentStore, DocumentWriter, MemoryStore, Role,
};
use docket_view::{Reconciler, ViewPhase};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Catalog file opened into a store context
pub(crate) struct Workspace {
    path: PathBuf,
    config: DocketConfig,
    store: Arc<MemoryStore>,
    bus: ChangeBus,
}

impl Workspace {
    pub(crate) async fn open(path: &Path, config: DocketConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let store = Arc::new(MemoryStore::isolated());
        store.put(&config.catalog_key, text).await?;
        tracing::debug!(path = %path.display(), "catalog opened");

        let bus = ChangeBus::new(config.bus_capacity);
        Ok(Self {
            path: path.to_path_buf(),
            config,
            store,
            bus,
        })
    }

    fn loader(&self) -> AggregateLoader {
        AggregateLoader::from_config(self.store.clone(), &self.config)
    }

    fn writer(&self, role: Role) -> DocumentWriter {
        DocumentWriter::from_config(self.store.clone(), self.bus.clone(), role, &self.config)
    }

    async fn save(&self) -> Result<()> {
        let stored = self
            .store
            .get(&self.config.catalog_key)
            .await?
            .ok_or_else(|| anyhow!("catalog key {} vanished", self.config.catalog_key))?;
        let value: serde_json::Value = serde_json::from_str(&stored.value)?;
        let pretty = serde_json::to_string_pretty(&value)?;
        std::fs::write(&self.path, pretty + "\n")
            .with_context(|| format!("failed to write catalog {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), revision = %stored.revision, "catalog saved");
        Ok(())
    }
}

pub(crate) async fn check(workspace: &Workspace) -> Result<String> {
    let (catalog, _) = workspace
        .loader()
        .read_catalog()
        .await
        .context("catalog is invalid")?;
    if let Some(first) = catalog.rejected_products().first() {
        bail!(
            "catalog is invalid: {} malformed product(s), first {}",
            catalog.rejected_products().len(),
            first.error()
        );
    }
    let documents: usize = catalog
        .products()
        .iter()
        .map(|p| DocumentKind::ALL.iter().map(|k| p.count(*k)).sum::<usize>())
        .sum();
    Ok(format!(
        "ok: {} portfolios, {} products, {} documents",
        catalog.portfolios().len(),
        catalog.products().len(),
        documents
    ))
}

pub(crate) async fn list(workspace: &Workspace) -> Result<String> {
    let (catalog, _) = workspace.loader().read_catalog().await?;
    Ok(render_catalog(&catalog))
}

pub(crate) async fn view(
    workspace: &Workspace,
    product_id: &str,
    period: MonthScope,
    json: bool,
) -> Result<String> {
    let reconciler = Reconciler::new(workspace.loader(), period);
    reconciler.mount(product_id).await?;

    match reconciler.phase() {
        ViewPhase::Ready(state) if json => Ok(serde_json::to_string_pretty(state.as_ref())?),
        ViewPhase::Ready(state) => Ok(render_view(&state)),
        ViewPhase::NotFound => bail!("product {product_id:?} not found"),
        ViewPhase::Loading => bail!("product {product_id:?} did not load"),
    }
}

/// What to publish
pub(crate) enum Publication {
    Roadmap { link: String },
    ReleaseGoal { goals: Vec<GoalItem> },
    ReleasePlan { items: Vec<PlanItem> },
    ReleaseNote { link: String },
}

pub(crate) async fn publish(
    workspace: &Workspace,
    role: Role,
    product_id: &str,
    period: MonthScope,
    publication: Publication,
) -> Result<String> {
    let writer = workspace.writer(role);
    let summary = match publication {
        Publication::Roadmap { link } => {
            let scope: YearScope = period.year_scope();
            let roadmap = writer.publish_roadmap(product_id, scope, link).await?;
            format!("published roadmap {} v{} ({})", scope, roadmap.version, roadmap.id)
        }
        Publication::ReleaseGoal { goals } => {
            let goal = writer.publish_release_goal(product_id, period, goals).await?;
            format!("published release goals {} v{} ({})", period, goal.version, goal.id)
        }
        Publication::ReleasePlan { items } => {
            let plan = writer.publish_release_plan(product_id, period, items).await?;
            format!("published release plan {} v{} ({})", period, plan.version, plan.id)
        }
        Publication::ReleaseNote { link } => {
            let note = writer.publish_release_note(product_id, period, link).await?;
            format!("published release notes {} v{} ({})", period, note.version, note.id)
        }
    };
    workspace.save().await?;
    Ok(summary)
}

/// Read goal or plan items from a JSON array file
pub(crate) fn read_items<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read items {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid items in {}", path.display()))
}
