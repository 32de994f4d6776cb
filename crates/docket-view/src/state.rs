//! Derived view state
//!
//! Pure derivation from a loaded aggregate and an active period: filter each
//! collection to the period, select the latest version (or a pinned one),
//! and compute the display links and metric summaries that depend on them.

use docket_model::{
    select_latest, versions_descending, DocVersion, DocumentKind, Metric, Period, Product,
    ReleaseGoal, ReleaseNote, ReleasePlan, Roadmap, Versioned,
};
use docket_store::{ProductAggregate, Revision};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Reconciler state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ViewPhase {
    /// Waiting on the first load for the current target
    Loading,
    /// Derived state for the current target and period
    Ready(Arc<ViewState>),
    /// Target id absent or its aggregate malformed
    NotFound,
}

impl ViewPhase {
    /// Derived state, when ready
    #[inline]
    #[must_use]
    pub fn state(&self) -> Option<&ViewState> {
        match self {
            Self::Ready(state) => Some(state.as_ref()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::NotFound => "not_found",
        }
    }
}

/// Owning portfolio as shown above a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub portfolio_id: String,
    /// `None` when the product's portfolio reference dangles
    pub portfolio_name: Option<String>,
}

/// Links computed from the selected documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedLinks {
    /// Link of the latest roadmap for the period's year
    pub roadmap: Option<String>,
    /// Link of the latest release notes for the period
    pub release_notes: Option<String>,
}

/// Versions published in the active period, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVersions {
    pub roadmap: Vec<DocVersion>,
    pub release_goals: Vec<DocVersion>,
    pub release_plans: Vec<DocVersion>,
    pub release_notes: Vec<DocVersion>,
}

impl AvailableVersions {
    /// Versions for one kind; empty for metrics
    #[must_use]
    pub fn for_kind(&self, kind: DocumentKind) -> &[DocVersion] {
        match kind {
            DocumentKind::Roadmap => &self.roadmap,
            DocumentKind::ReleaseGoal => &self.release_goals,
            DocumentKind::ReleasePlan => &self.release_plans,
            DocumentKind::ReleaseNote => &self.release_notes,
            DocumentKind::Metric => &[],
        }
    }
}

/// One metric with its attainment against targets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub monthly_target: Option<f64>,
    pub annual_target: Option<f64>,
    /// `value / monthly_target`
    pub monthly_attainment: Option<f64>,
    /// `value / annual_target`
    pub annual_attainment: Option<f64>,
}

impl MetricSummary {
    /// Whether the monthly target is met; `None` without a target
    #[inline]
    #[must_use]
    pub fn meets_monthly_target(&self) -> Option<bool> {
        self.monthly_target.map(|target| self.value >= target)
    }
}

impl From<&Metric> for MetricSummary {
    fn from(metric: &Metric) -> Self {
        Self {
            id: metric.id.clone(),
            name: metric.name.clone(),
            value: metric.value,
            monthly_target: metric.monthly_target,
            annual_target: metric.annual_target,
            monthly_attainment: attainment(metric.value, metric.monthly_target),
            annual_attainment: attainment(metric.value, metric.annual_target),
        }
    }
}

fn attainment(value: f64, target: Option<f64>) -> Option<f64> {
    target
        .filter(|t| t.is_finite() && *t != 0.0)
        .map(|t| value / t)
}

/// Explicit version choices overriding "latest" for the active period
///
/// A pin naming a version absent from the period falls back to latest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPins(HashMap<DocumentKind, DocVersion>);

impl VersionPins {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a version; returns the previous pin for the kind
    pub fn pin(&mut self, kind: DocumentKind, version: DocVersion) -> Option<DocVersion> {
        self.0.insert(kind, version)
    }

    /// Return a kind to "latest"
    pub fn unpin(&mut self, kind: DocumentKind) -> Option<DocVersion> {
        self.0.remove(&kind)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: DocumentKind) -> Option<&DocVersion> {
        self.0.get(&kind)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Display state for one product and period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub product_id: String,
    pub product_name: String,
    pub breadcrumb: Breadcrumb,
    pub period: Period,
    pub roadmap: Option<Roadmap>,
    pub release_goal: Option<ReleaseGoal>,
    pub release_plan: Option<ReleasePlan>,
    pub release_note: Option<ReleaseNote>,
    /// Every metric in the period, in stored order
    pub metrics: Vec<MetricSummary>,
    pub versions: AvailableVersions,
    pub links: DerivedLinks,
    /// Catalog revision the state was derived from
    pub revision: Revision,
}

impl ViewState {
    /// Derive display state from an aggregate for a period
    #[must_use]
    pub fn derive(aggregate: &ProductAggregate, period: Period, pins: &VersionPins) -> Self {
        let product = &aggregate.product;
        let year = period.year_scope();

        let roadmaps = product.roadmaps_in(&year);
        let goals = product.release_goals_in(&period);
        let plans = product.release_plans_in(&period);
        let notes = product.release_notes_in(&period);

        let roadmap = pick(&roadmaps, pins.get(DocumentKind::Roadmap)).cloned();
        let release_goal = pick(&goals, pins.get(DocumentKind::ReleaseGoal)).cloned();
        let release_plan = pick(&plans, pins.get(DocumentKind::ReleasePlan)).cloned();
        let release_note = pick(&notes, pins.get(DocumentKind::ReleaseNote)).cloned();

        let links = DerivedLinks {
            roadmap: select_latest(roadmaps.iter().copied()).map(|r| r.link.clone()),
            release_notes: select_latest(notes.iter().copied()).map(|n| n.link.clone()),
        };

        let versions = AvailableVersions {
            roadmap: distinct_versions(&roadmaps),
            release_goals: distinct_versions(&goals),
            release_plans: distinct_versions(&plans),
            release_notes: distinct_versions(&notes),
        };

        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            breadcrumb: breadcrumb(aggregate),
            period,
            roadmap,
            release_goal,
            release_plan,
            release_note,
            metrics: metric_summaries(product, period),
            versions,
            links,
            revision: aggregate.revision,
        }
    }

    /// Whether nothing at all is published for the period
    #[must_use]
    pub fn is_empty_period(&self) -> bool {
        self.roadmap.is_none()
            && self.release_goal.is_none()
            && self.release_plan.is_none()
            && self.release_note.is_none()
            && self.metrics.is_empty()
    }
}

fn pick<'a, T: Versioned>(scoped: &[&'a T], pinned: Option<&DocVersion>) -> Option<&'a T> {
    // last match mirrors select_latest's tie-break
    pinned
        .and_then(|version| scoped.iter().rev().copied().find(|d| d.version() == version))
        .or_else(|| select_latest(scoped.iter().copied()))
}

fn distinct_versions<T: Versioned>(scoped: &[&T]) -> Vec<DocVersion> {
    let mut versions: Vec<DocVersion> = versions_descending(scoped.iter().copied())
        .into_iter()
        .map(|d| d.version().clone())
        .collect();
    versions.dedup();
    versions
}

fn breadcrumb(aggregate: &ProductAggregate) -> Breadcrumb {
    Breadcrumb {
        portfolio_id: aggregate.product.portfolio_id.clone(),
        portfolio_name: aggregate.portfolio.as_ref().map(|p| p.name.clone()),
    }
}

fn metric_summaries(product: &Product, period: Period) -> Vec<MetricSummary> {
    product
        .metrics_in(&period)
        .into_iter()
        .map(MetricSummary::from)
        .collect()
}
