//! Docket view reconciliation
//!
//! Keeps a consumer's derived display state consistent with the store:
//! - [`Reconciler`]: per-consumer state machine (`Loading` → `Ready` / `NotFound`)
//! - [`ViewState`]: latest (or pinned) document per collection for a period,
//!   with derived links and metric summaries
//! - [`RequestSequence`]: last-request-wins stamping for overlapping reloads
//!
//! # Example
//!
//! ```rust,ignore
//! use docket_model::MonthScope;
//! use docket_store::{AggregateLoader, ChangeBus, MemoryMedium};
//! use docket_view::Reconciler;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryMedium::default().open_context());
//! let bus = ChangeBus::default();
//! let loader = AggregateLoader::new(store.clone(), "portfolioData");
//!
//! let reconciler = Arc::new(Reconciler::new(loader, MonthScope::new(4, 2025)?));
//! reconciler.mount("p-1").await?;
//! let _listener = reconciler.listen(bus.subscribe(store.as_ref()));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod reconciler;
pub mod sequence;
pub mod state;

// Re-exports for convenience
pub use error::ViewError;
pub use reconciler::{Reconciler, ReloadOutcome};
pub use sequence::{RequestSequence, RequestStamp};
pub use state::{
    AvailableVersions, Breadcrumb, DerivedLinks, MetricSummary, VersionPins, ViewPhase, ViewState,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with view reconciliation
    pub use crate::{Reconciler, ReloadOutcome, ViewError, ViewPhase, ViewState};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
