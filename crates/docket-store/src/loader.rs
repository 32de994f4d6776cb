//! Product aggregate loader
//!
//! Resolves a product (and its owning portfolio) from the store by id.
//! Every call reads the store; nothing is cached between calls.

use crate::codec::{decode_catalog, Catalog};
use crate::config::DocketConfig;
use crate::error::LoadError;
use crate::store::{DocumentStore, Revision};
use docket_model::{Portfolio, Product};
use std::sync::Arc;

/// A product with its breadcrumb portfolio
#[derive(Debug, Clone, PartialEq)]
pub struct ProductAggregate {
    /// The product and all its document history
    pub product: Product,
    /// Owning portfolio; `None` when the back-reference dangles
    pub portfolio: Option<Portfolio>,
    /// Catalog revision the aggregate was read at
    pub revision: Revision,
}

/// A portfolio with its member products in display order
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioAggregate {
    pub portfolio: Portfolio,
    pub products: Vec<Product>,
    pub revision: Revision,
}

/// Reads aggregates out of a [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct AggregateLoader {
    store: Arc<dyn DocumentStore>,
    catalog_key: String,
}

impl AggregateLoader {
    /// Create loader reading `catalog_key`
    #[inline]
    pub fn new(store: Arc<dyn DocumentStore>, catalog_key: impl Into<String>) -> Self {
        Self {
            store,
            catalog_key: catalog_key.into(),
        }
    }

    /// Create loader using the configured catalog key
    #[inline]
    #[must_use]
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &DocketConfig) -> Self {
        Self::new(store, config.catalog_key.clone())
    }

    /// Store this loader reads from
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Root key holding the catalog
    #[inline]
    #[must_use]
    pub fn catalog_key(&self) -> &str {
        &self.catalog_key
    }

    /// Read and decode the whole catalog
    ///
    /// An absent key is an empty catalog at `Revision::ZERO`.
    ///
    /// # Errors
    /// - `LoadError::Malformed` if the stored text fails to decode
    /// - `LoadError::Store` if the store cannot be read
    pub async fn read_catalog(&self) -> Result<(Catalog, Revision), LoadError> {
        let Some(stored) = self.store.get(&self.catalog_key).await? else {
            tracing::debug!(key = %self.catalog_key, "catalog key absent");
            return Ok((Catalog::new(), Revision::ZERO));
        };

        match decode_catalog(&stored.value) {
            Ok(catalog) => Ok((catalog, stored.revision)),
            Err(err) => {
                tracing::warn!(
                    key = %self.catalog_key,
                    revision = %stored.revision,
                    error = %err,
                    "malformed catalog in store"
                );
                Err(LoadError::Malformed(err))
            }
        }
    }

    /// Load a product and its owning portfolio
    ///
    /// A quarantined product fails on its own; other products still load.
    ///
    /// # Errors
    /// - `LoadError::NotFound` if no product has this id
    /// - `LoadError::Malformed` if the stored catalog or this product fails to decode
    /// - `LoadError::Store` if the store cannot be read
    pub async fn load(&self, product_id: &str) -> Result<ProductAggregate, LoadError> {
        let (catalog, revision) = self.read_catalog().await?;

        let Some(product) = catalog.product(product_id).cloned() else {
            if let Some(rejected) = catalog.rejected(product_id) {
                tracing::warn!(
                    product_id,
                    %revision,
                    reason = %rejected.reason,
                    "requested product is malformed"
                );
                return Err(LoadError::Malformed(rejected.error()));
            }
            return Err(LoadError::product_not_found(product_id));
        };

        let portfolio = catalog.portfolio(&product.portfolio_id).cloned();
        if portfolio.is_none() {
            tracing::warn!(
                product_id,
                portfolio_id = %product.portfolio_id,
                "product refers to missing portfolio"
            );
        }

        tracing::debug!(product_id, %revision, "loaded product aggregate");
        Ok(ProductAggregate {
            product,
            portfolio,
            revision,
        })
    }

    /// Load a portfolio and its products
    ///
    /// Listed ids without a product are skipped.
    ///
    /// # Errors
    /// - `LoadError::NotFound` if no portfolio has this id
    /// - `LoadError::Malformed` if the stored catalog fails to decode
    /// - `LoadError::Store` if the store cannot be read
    pub async fn load_portfolio(
        &self,
        portfolio_id: &str,
    ) -> Result<PortfolioAggregate, LoadError> {
        let (catalog, revision) = self.read_catalog().await?;

        let portfolio = catalog
            .portfolio(portfolio_id)
            .cloned()
            .ok_or_else(|| LoadError::portfolio_not_found(portfolio_id))?;

        let products = portfolio
            .product_ids
            .iter()
            .filter_map(|id| {
                let product = catalog.product(id);
                if product.is_none() {
                    let malformed = catalog.rejected(id).is_some();
                    tracing::warn!(
                        portfolio_id,
                        product_id = %id,
                        malformed,
                        "portfolio lists unloadable product"
                    );
                }
                product.cloned()
            })
            .collect();

        Ok(PortfolioAggregate {
            portfolio,
            products,
            revision,
        })
    }
}
