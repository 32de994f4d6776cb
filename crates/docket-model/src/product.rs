//! Portfolios and product aggregates
//!
//! A [`Product`] exclusively owns its document collections and is loaded and
//! saved as one unit. A [`Portfolio`] refers to products by id only.

use crate::documents::{
    Document, DocumentKind, Metric, ReleaseGoal, ReleaseNote, ReleasePlan, Roadmap,
};
use crate::error::ModelError;
use crate::filter::filter_scope;
use crate::scope::{MonthScope, YearScope};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Named group of products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    /// Member products in display order
    #[serde(default)]
    pub product_ids: Vec<String>,
}

/// Product aggregate with all of its document collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Owning portfolio (weak back-reference)
    pub portfolio_id: String,
    #[serde(default)]
    pub roadmap: Vec<Roadmap>,
    #[serde(default)]
    pub release_goals: Vec<ReleaseGoal>,
    #[serde(default)]
    pub release_plans: Vec<ReleasePlan>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub release_notes: Vec<ReleaseNote>,
}

impl Product {
    /// Create product with empty collections
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        portfolio_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            portfolio_id: portfolio_id.into(),
            roadmap: Vec::new(),
            release_goals: Vec::new(),
            release_plans: Vec::new(),
            metrics: Vec::new(),
            release_notes: Vec::new(),
        }
    }

    /// Append a document to its collection
    ///
    /// History is never rewritten; a new version is always a new entry.
    ///
    /// # Errors
    /// Returns `ModelError::DuplicateDocumentId` if the id is already used
    /// in the same collection and scope
    pub fn append(&mut self, document: Document) -> Result<(), ModelError> {
        if self.contains_in_scope(&document) {
            return Err(ModelError::DuplicateDocumentId {
                product_id: self.id.clone(),
                kind: document.kind(),
                id: document.id().to_string(),
            });
        }

        match document {
            Document::Roadmap(d) => self.roadmap.push(d),
            Document::ReleaseGoal(d) => self.release_goals.push(d),
            Document::ReleasePlan(d) => self.release_plans.push(d),
            Document::Metric(d) => self.metrics.push(d),
            Document::ReleaseNote(d) => self.release_notes.push(d),
        }
        Ok(())
    }

    /// Roadmaps for a year
    #[must_use]
    pub fn roadmaps_in(&self, scope: &YearScope) -> Vec<&Roadmap> {
        filter_scope(&self.roadmap, scope)
    }

    /// Release goal versions for a month
    #[must_use]
    pub fn release_goals_in(&self, scope: &MonthScope) -> Vec<&ReleaseGoal> {
        filter_scope(&self.release_goals, scope)
    }

    /// Release plan versions for a month
    #[must_use]
    pub fn release_plans_in(&self, scope: &MonthScope) -> Vec<&ReleasePlan> {
        filter_scope(&self.release_plans, scope)
    }

    /// Metrics for a month
    #[must_use]
    pub fn metrics_in(&self, scope: &MonthScope) -> Vec<&Metric> {
        filter_scope(&self.metrics, scope)
    }

    /// Release note versions for a month
    #[must_use]
    pub fn release_notes_in(&self, scope: &MonthScope) -> Vec<&ReleaseNote> {
        filter_scope(&self.release_notes, scope)
    }

    /// Number of documents of a kind across all scopes
    #[must_use]
    pub fn count(&self, kind: DocumentKind) -> usize {
        match kind {
            DocumentKind::Roadmap => self.roadmap.len(),
            DocumentKind::ReleaseGoal => self.release_goals.len(),
            DocumentKind::ReleasePlan => self.release_plans.len(),
            DocumentKind::Metric => self.metrics.len(),
            DocumentKind::ReleaseNote => self.release_notes.len(),
        }
    }

    /// Check that ids are unique per collection and scope key
    ///
    /// # Errors
    /// Returns the first duplicate found
    pub fn validate(&self) -> Result<(), ModelError> {
        fn check<'a, K: std::hash::Hash + Eq>(
            product: &Product,
            kind: DocumentKind,
            keys: impl Iterator<Item = (K, &'a str)>,
        ) -> Result<(), ModelError> {
            let mut seen = HashSet::new();
            for (scope, id) in keys {
                if !seen.insert((scope, id)) {
                    return Err(ModelError::DuplicateDocumentId {
                        product_id: product.id.clone(),
                        kind,
                        id: id.to_string(),
                    });
                }
            }
            Ok(())
        }

        check(
            self,
            DocumentKind::Roadmap,
            self.roadmap.iter().map(|d| (d.year, d.id.as_str())),
        )?;
        check(
            self,
            DocumentKind::ReleaseGoal,
            self.release_goals
                .iter()
                .map(|d| ((d.month, d.year), d.id.as_str())),
        )?;
        check(
            self,
            DocumentKind::ReleasePlan,
            self.release_plans
                .iter()
                .map(|d| ((d.month, d.year), d.id.as_str())),
        )?;
        check(
            self,
            DocumentKind::Metric,
            self.metrics.iter().map(|d| ((d.month, d.year), d.id.as_str())),
        )?;
        check(
            self,
            DocumentKind::ReleaseNote,
            self.release_notes
                .iter()
                .map(|d| ((d.month, d.year), d.id.as_str())),
        )
    }

    fn contains_in_scope(&self, document: &Document) -> bool {
        match document {
            Document::Roadmap(new) => self
                .roadmap
                .iter()
                .any(|d| d.id == new.id && d.year == new.year),
            Document::ReleaseGoal(new) => self
                .release_goals
                .iter()
                .any(|d| d.id == new.id && d.month == new.month && d.year == new.year),
            Document::ReleasePlan(new) => self
                .release_plans
                .iter()
                .any(|d| d.id == new.id && d.month == new.month && d.year == new.year),
            Document::Metric(new) => self
                .metrics
                .iter()
                .any(|d| d.id == new.id && d.month == new.month && d.year == new.year),
            Document::ReleaseNote(new) => self
                .release_notes
                .iter()
                .any(|d| d.id == new.id && d.month == new.month && d.year == new.year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::DocVersion;

    fn goal(id: &str, month: u8, version: u64) -> ReleaseGoal {
        ReleaseGoal {
            id: id.to_string(),
            month,
            year: 2025,
            version: DocVersion::from_major(version),
            goals: Vec::new(),
        }
    }

    #[test]
    fn append_routes_by_kind() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product
            .append(Document::ReleaseGoal(goal("rg-1", 4, 1)))
            .unwrap();

        assert_eq!(product.count(DocumentKind::ReleaseGoal), 1);
        assert_eq!(product.count(DocumentKind::Roadmap), 0);
    }

    #[test]
    fn append_rejects_duplicate_id_in_same_scope() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product
            .append(Document::ReleaseGoal(goal("rg-1", 4, 1)))
            .unwrap();

        let err = product
            .append(Document::ReleaseGoal(goal("rg-1", 4, 2)))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDocumentId { .. }));

        // same id in another month is a different scope key
        assert!(product
            .append(Document::ReleaseGoal(goal("rg-1", 5, 1)))
            .is_ok());
    }

    #[test]
    fn validate_reports_duplicates() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product.release_goals.push(goal("rg-1", 4, 1));
        product.release_goals.push(goal("rg-1", 4, 2));

        let err = product.validate().unwrap_err();
        assert!(err.to_string().contains("rg-1"));
    }

    #[test]
    fn missing_collections_deserialize_empty() {
        let json = r#"{"id":"p-1","name":"Atlas","portfolioId":"pf-1"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.roadmap.is_empty());
        assert!(product.release_notes.is_empty());
        assert!(product.validate().is_ok());
    }

    #[test]
    fn scoped_accessors_filter() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product.release_goals.push(goal("rg-1", 4, 1));
        product.release_goals.push(goal("rg-2", 5, 1));

        let april = MonthScope::new(4, 2025).unwrap();
        let found = product.release_goals_in(&april);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "rg-1");
    }
}
