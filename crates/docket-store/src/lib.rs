//! Docket store boundary
//!
//! Everything between the document model and a persistent medium:
//! - [`DocumentStore`]: injectable key/value seam with per-key revisions
//! - [`MemoryMedium`] / [`MemoryStore`]: shared medium with one handle per
//!   execution context
//! - [`ChangeBus`]: in-context signals merged with cross-context store
//!   broadcasts
//! - [`AggregateLoader`]: resolves a product and its portfolio by id
//! - [`DocumentWriter`]: appends new document versions with optimistic
//!   concurrency
//!
//! # Example
//!
//! ```rust,ignore
//! use docket_store::{AggregateLoader, ChangeBus, DocumentWriter, MemoryMedium, Role};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let medium = MemoryMedium::default();
//! let store = Arc::new(medium.open_context());
//! let bus = ChangeBus::default();
//!
//! let writer = DocumentWriter::new(store.clone(), bus.clone(), Role::Editor);
//! let loader = AggregateLoader::new(store, "portfolioData");
//!
//! let aggregate = loader.load("p-1").await?;
//! println!("{} has {} roadmaps", aggregate.product.name, aggregate.product.roadmap.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod bus;
pub mod codec;
pub mod config;
pub mod error;
pub mod loader;
pub mod memory;
pub mod store;
pub mod writer;

// Re-exports for convenience
pub use bus::{
    ChangeBus, ChangeNotice, ChangeSubscriber, NoticeOrigin, Signal, PRODUCT_DATA_UPDATED,
};
pub use codec::{decode_catalog, encode_catalog, Catalog, RejectedProduct};
pub use config::{DocketConfig, DEFAULT_CATALOG_KEY};
pub use error::{CodecError, ConfigError, Entity, LoadError, StoreError, WriteError};
pub use loader::{AggregateLoader, PortfolioAggregate, ProductAggregate};
pub use memory::{MemoryMedium, MemoryStore};
pub use store::{ContextId, DocumentStore, Revision, StoreChange, StoreSignal, StoreWatch, Stored};
pub use writer::{DocumentWriter, Role, UnknownRole};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the store boundary
    pub use crate::{
        AggregateLoader, Catalog, ChangeBus, ChangeNotice, DocketConfig, DocumentStore,
        DocumentWriter, LoadError, MemoryMedium, MemoryStore, ProductAggregate, Revision, Role,
        WriteError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
