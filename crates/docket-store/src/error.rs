//! Error types for the store boundary
//!
//! Provides error handling for:
//! - Store reads and writes
//! - Catalog decoding and shape validation
//! - Aggregate lookups
//! - Permissioned writes
//! - Configuration loading

use crate::store::Revision;
use crate::writer::Role;
use docket_model::ModelError;
use std::fmt::{self, Display, Formatter};

/// Store medium errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Conditional write lost to a concurrent writer
    #[error("revision conflict on {key}: expected {expected}, found {actual}")]
    RevisionConflict {
        key: String,
        expected: Revision,
        actual: Revision,
    },

    /// Medium cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Catalog decoding and validation errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Stored text is not valid catalog JSON
    #[error("catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two products share an id
    #[error("duplicate product id {0:?}")]
    DuplicateProduct(String),

    /// Two portfolios share an id
    #[error("duplicate portfolio id {0:?}")]
    DuplicatePortfolio(String),

    /// A product violates a model invariant
    #[error("invalid product: {0}")]
    Invalid(#[from] ModelError),

    /// One stored product failed to decode; the rest of the catalog is usable
    #[error("product {id:?} is malformed: {reason}")]
    MalformedProduct { id: String, reason: String },
}

/// Entity a lookup was about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// Product aggregate
    Product,
    /// Portfolio
    Portfolio,
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => f.write_str("product"),
            Self::Portfolio => f.write_str("portfolio"),
        }
    }
}

/// Aggregate loading errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Requested id is absent
    #[error("{entity} {id:?} not found")]
    NotFound { entity: Entity, id: String },

    /// Stored catalog failed to parse or validate
    #[error("malformed aggregate: {0}")]
    Malformed(#[from] CodecError),

    /// Medium failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LoadError {
    /// Product not found
    #[inline]
    pub fn product_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Product,
            id: id.into(),
        }
    }

    /// Portfolio not found
    #[inline]
    pub fn portfolio_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: Entity::Portfolio,
            id: id.into(),
        }
    }

    /// Whether consumers should treat this as "nothing here"
    ///
    /// Malformed aggregates are handled exactly like missing ones.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Malformed(_))
    }

    /// Whether retrying the read may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }
}

/// Document write errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Caller's role may not write
    #[error("role {0} may not write documents")]
    Forbidden(Role),

    /// Target product is absent
    #[error("product {0:?} not found")]
    ProductNotFound(String),

    /// Catalog changed between read and write
    #[error("stale write on {key}: read at {read}, now at {current}")]
    Stale {
        key: String,
        read: Revision,
        current: Revision,
    },

    /// Stored catalog failed to parse or validate
    #[error("malformed aggregate: {0}")]
    Malformed(#[from] CodecError),

    /// Document violates a model invariant
    #[error("invalid document: {0}")]
    Model(#[from] ModelError),

    /// Medium failure
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for WriteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RevisionConflict {
                key,
                expected,
                actual,
            } => Self::Stale {
                key,
                read: expected,
                current: actual,
            },
            other => Self::Store(other),
        }
    }
}

impl WriteError {
    /// Whether the edit should be re-applied on a fresh read
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but make no sense
    #[error("invalid config: {0}")]
    Invalid(String),
}
