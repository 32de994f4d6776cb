//! Docket document model
//!
//! Time-scoped, versioned product documents and the two pure functions that
//! resolve them.
//!
//! # Core Concepts
//!
//! - [`Product`]: aggregate owning roadmaps, release goals, release plans,
//!   metrics and release notes
//! - [`YearScope`] / [`MonthScope`]: the period a document belongs to
//! - [`DocVersion`]: dotted version compared numerically (`1.10` > `1.9`)
//! - [`filter_scope`]: narrow a collection to one scope
//! - [`select_latest`]: pick the authoritative version within a scope
//!
//! # Example
//!
//! ```rust
//! use docket_model::{select_latest, DocVersion, MonthScope, Product, ReleaseGoal};
//!
//! let mut product = Product::new("p-1", "Atlas", "pf-1");
//! for version in [1, 2] {
//!     product.release_goals.push(ReleaseGoal {
//!         id: format!("rg-{version}"),
//!         month: 4,
//!         year: 2025,
//!         version: DocVersion::from_major(version),
//!         goals: Vec::new(),
//!     });
//! }
//!
//! let april = MonthScope::new(4, 2025).unwrap();
//! let scoped = product.release_goals_in(&april);
//! assert_eq!(scoped.len(), 2);
//! assert_eq!(select_latest(scoped).unwrap().id, "rg-2");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod documents;
mod error;
mod filter;
mod legacy;
mod product;
mod scope;
mod select;
mod version;

// Re-exports
pub use documents::{
    Document, DocumentKind, GoalItem, Metric, PlanItem, ReleaseGoal, ReleaseNote, ReleasePlan,
    Roadmap, Versioned,
};
pub use error::ModelError;
pub use filter::filter_scope;
pub use product::{Portfolio, Product};
pub use scope::{MonthScope, Period, ScopeError, ScopedDocument, YearScope};
pub use select::{next_version, select_latest, versions_descending};
pub use version::{DocVersion, VersionParseError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with product documents
    pub use crate::{
        filter_scope, select_latest, DocVersion, Document, DocumentKind, MonthScope, Period,
        Portfolio, Product, ScopedDocument, Versioned, YearScope,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn goal(version: u64) -> ReleaseGoal {
        ReleaseGoal {
            id: format!("rg-v{version}"),
            month: 4,
            year: 2025,
            version: DocVersion::from_major(version),
            goals: Vec::new(),
        }
    }

    #[test]
    fn april_goals_resolve_to_second_version() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product.release_goals = vec![goal(1), goal(2)];

        let scope = MonthScope::new(4, 2025).unwrap();
        let scoped = filter_scope(&product.release_goals, &scope);
        assert_eq!(scoped.len(), 2);

        let latest = select_latest(scoped).unwrap();
        assert_eq!(latest.version, DocVersion::from_major(2));
    }

    #[test]
    fn missing_roadmap_year_is_not_an_error() {
        let product = Product::new("p-1", "Atlas", "pf-1");
        let scoped = filter_scope(&product.roadmap, &YearScope::new(2024));
        assert!(scoped.is_empty());
        assert!(select_latest(scoped).is_none());
    }

    #[test]
    fn product_round_trips_through_json() {
        let mut product = Product::new("p-1", "Atlas", "pf-1");
        product.release_goals = vec![goal(1), goal(2)];
        product.roadmap.push(Roadmap {
            id: "r-1".into(),
            year: 2025,
            version: DocVersion::parse("1.10").unwrap(),
            link: "https://example.com/roadmap".into(),
            created_at: Some(chrono::Utc::now()),
        });

        let json = serde_json::to_string(&product).unwrap();
        let back: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(back, product);
    }
}
