//! Catalog codec
//!
//! The whole document set lives under one root key as
//! `{ "portfolios": [...], "products": [...] }`. Decoding is the store-read
//! boundary: parsing, legacy-shape normalization and shape validation all
//! happen here, and nowhere downstream.
//!
//! A root that is not catalog JSON fails as a whole. A single product that
//! fails to decode or validate is quarantined as a [`RejectedProduct`]: the
//! rest of the catalog stays usable, and the rejected entry is written back
//! verbatim so a write to a healthy product never drops it.

use crate::error::CodecError;
use docket_model::{Portfolio, Product};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    portfolios: Vec<Portfolio>,
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    portfolios: &'a [Portfolio],
    products: StoredProducts<'a>,
}

/// Valid products followed by the raw text of rejected ones
struct StoredProducts<'a> {
    products: &'a [Product],
    rejected: &'a [RejectedProduct],
}

impl Serialize for StoredProducts<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.products.len() + self.rejected.len()))?;
        for product in self.products {
            seq.serialize_element(product)?;
        }
        for rejected in self.rejected {
            seq.serialize_element(&rejected.raw)?;
        }
        seq.end()
    }
}

/// Stored product that failed to decode or validate
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedProduct {
    /// Id taken from the raw entry
    pub id: String,
    /// Why decoding failed
    pub reason: String,
    raw: Value,
}

impl RejectedProduct {
    /// Error reported to anyone asking for this product
    #[must_use]
    pub fn error(&self) -> CodecError {
        CodecError::MalformedProduct {
            id: self.id.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Validated set of portfolios and products, indexed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    portfolios: Vec<Portfolio>,
    products: Vec<Product>,
    rejected: Vec<RejectedProduct>,
    portfolio_index: HashMap<String, usize>,
    product_index: HashMap<String, usize>,
    rejected_index: HashMap<String, usize>,
}

impl Catalog {
    /// Empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a catalog
    ///
    /// # Errors
    /// Returns `CodecError` on duplicate ids or invalid products
    pub fn from_parts(
        portfolios: Vec<Portfolio>,
        products: Vec<Product>,
    ) -> Result<Self, CodecError> {
        let mut catalog = Self::new();
        for portfolio in portfolios {
            catalog.insert_portfolio(portfolio)?;
        }
        for product in products {
            product.validate()?;
            catalog.push_product(product)?;
        }
        Ok(catalog)
    }

    fn claim_id(&self, id: &str) -> Result<(), CodecError> {
        if self.product_index.contains_key(id) || self.rejected_index.contains_key(id) {
            return Err(CodecError::DuplicateProduct(id.to_string()));
        }
        Ok(())
    }

    fn push_product(&mut self, product: Product) -> Result<(), CodecError> {
        self.claim_id(&product.id)?;
        self.product_index
            .insert(product.id.clone(), self.products.len());
        self.products.push(product);
        Ok(())
    }

    fn push_rejected(&mut self, rejected: RejectedProduct) -> Result<(), CodecError> {
        self.claim_id(&rejected.id)?;
        self.rejected_index
            .insert(rejected.id.clone(), self.rejected.len());
        self.rejected.push(rejected);
        Ok(())
    }

    /// Add a portfolio
    ///
    /// # Errors
    /// Returns `CodecError::DuplicatePortfolio` if the id is taken
    pub fn insert_portfolio(&mut self, portfolio: Portfolio) -> Result<(), CodecError> {
        if self.portfolio_index.contains_key(&portfolio.id) {
            return Err(CodecError::DuplicatePortfolio(portfolio.id));
        }
        self.portfolio_index
            .insert(portfolio.id.clone(), self.portfolios.len());
        self.portfolios.push(portfolio);
        Ok(())
    }

    /// Add a product and list it under its portfolio
    ///
    /// # Errors
    /// Returns `CodecError` on a duplicate id or an invalid product
    pub fn insert_product(&mut self, product: Product) -> Result<(), CodecError> {
        product.validate()?;
        self.claim_id(&product.id)?;
        if let Some(&idx) = self.portfolio_index.get(&product.portfolio_id) {
            let members = &mut self.portfolios[idx].product_ids;
            if !members.contains(&product.id) {
                members.push(product.id.clone());
            }
        }
        self.push_product(product)
    }

    /// Product by id
    #[inline]
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.product_index.get(id).map(|&idx| &self.products[idx])
    }

    /// Mutable product by id
    ///
    /// The id itself must not be changed through this reference.
    #[inline]
    pub fn product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.product_index
            .get(id)
            .map(|&idx| &mut self.products[idx])
    }

    /// Quarantined product by id
    #[inline]
    #[must_use]
    pub fn rejected(&self, id: &str) -> Option<&RejectedProduct> {
        self.rejected_index.get(id).map(|&idx| &self.rejected[idx])
    }

    /// All quarantined products in stored order
    #[inline]
    #[must_use]
    pub fn rejected_products(&self) -> &[RejectedProduct] {
        &self.rejected
    }

    /// Portfolio by id
    #[inline]
    #[must_use]
    pub fn portfolio(&self, id: &str) -> Option<&Portfolio> {
        self.portfolio_index.get(id).map(|&idx| &self.portfolios[idx])
    }

    /// All portfolios in stored order
    #[inline]
    #[must_use]
    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    /// All products in stored order
    #[inline]
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Whether the catalog holds nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty() && self.products.is_empty() && self.rejected.is_empty()
    }
}

/// Parse and validate stored catalog text
///
/// Products that fail on their own are quarantined rather than failing the
/// catalog; see [`Catalog::rejected`].
///
/// # Errors
/// Returns `CodecError` if the root is not catalog JSON, an id is shared, or
/// a failing product carries no id to quarantine it under
pub fn decode_catalog(json: &str) -> Result<Catalog, CodecError> {
    let document: CatalogDocument = serde_json::from_str(json)?;
    let mut catalog = Catalog::new();
    for portfolio in document.portfolios {
        catalog.insert_portfolio(portfolio)?;
    }

    for raw in document.products {
        match decode_product(&raw) {
            Ok(product) => catalog.push_product(product)?,
            Err(err) => {
                let Some(id) = raw.get("id").and_then(Value::as_str).map(str::to_owned) else {
                    return Err(err);
                };
                tracing::warn!(product_id = %id, error = %err, "quarantining malformed product");
                catalog.push_rejected(RejectedProduct {
                    id,
                    reason: err.to_string(),
                    raw,
                })?;
            }
        }
    }
    Ok(catalog)
}

fn decode_product(raw: &Value) -> Result<Product, CodecError> {
    let product = Product::deserialize(raw)?;
    product.validate()?;
    Ok(product)
}

/// Serialize a catalog in canonical shape
///
/// # Errors
/// Returns `CodecError::Parse` if serialization fails
pub fn encode_catalog(catalog: &Catalog) -> Result<String, CodecError> {
    let document = CatalogDocumentRef {
        portfolios: &catalog.portfolios,
        products: StoredProducts {
            products: &catalog.products,
            rejected: &catalog.rejected,
        },
    };
    Ok(serde_json::to_string(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "portfolios": [{ "id": "pf-1", "name": "Platform", "productIds": ["p-1"] }],
        "products": [{
            "id": "p-1",
            "name": "Atlas",
            "portfolioId": "pf-1",
            "releaseGoals": [
                { "id": "rg-1", "month": "4", "year": 2025, "version": 1,
                  "goals": [{ "goal": { "id": "g-1", "description": "Ship" } }] }
            ]
        }]
    }"#;

    #[test]
    fn decode_indexes_by_id() {
        let catalog = decode_catalog(SAMPLE).unwrap();
        assert_eq!(catalog.product("p-1").unwrap().name, "Atlas");
        assert_eq!(catalog.portfolio("pf-1").unwrap().product_ids, ["p-1"]);
        assert!(catalog.product("p-2").is_none());
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let catalog = decode_catalog(SAMPLE).unwrap();
        let again = decode_catalog(&encode_catalog(&catalog).unwrap()).unwrap();
        assert_eq!(again, catalog);
    }

    #[test]
    fn missing_sections_decode_empty() {
        let catalog = decode_catalog("{}").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn parse_failure_is_reported() {
        assert!(matches!(decode_catalog("{not json"), Err(CodecError::Parse(_))));
        assert!(matches!(
            decode_catalog(r#"{"products": 3}"#),
            Err(CodecError::Parse(_))
        ));
        // nothing to quarantine it under
        assert!(matches!(
            decode_catalog(r#"{"products":[{"name":"Atlas"}]}"#),
            Err(CodecError::Parse(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{"products":[
            {"id":"p-1","name":"A","portfolioId":"pf"},
            {"id":"p-1","name":"B","portfolioId":"pf"}]}"#;
        assert!(matches!(
            decode_catalog(json),
            Err(CodecError::DuplicateProduct(id)) if id == "p-1"
        ));

        let shadowed = r#"{"products":[
            {"id":"p-1","name":"A","portfolioId":"pf"},
            {"id":"p-1","name":"B"}]}"#;
        assert!(matches!(
            decode_catalog(shadowed),
            Err(CodecError::DuplicateProduct(_))
        ));
    }

    #[test]
    fn duplicate_document_ids_quarantine_the_product() {
        let json = r#"{"products":[{"id":"p-1","name":"A","portfolioId":"pf",
            "releaseNotes":[
                {"id":"rn","month":4,"year":2025,"version":1,"link":"a"},
                {"id":"rn","month":4,"year":2025,"version":2,"link":"b"}]}]}"#;
        let catalog = decode_catalog(json).unwrap();
        assert!(catalog.product("p-1").is_none());
        assert!(catalog.rejected("p-1").unwrap().reason.contains("invalid product"));
    }

    const ONE_BAD_PRODUCT: &str = r#"{
        "products": [
            { "id": "p-1", "name": "Atlas", "portfolioId": "pf-1" },
            { "id": "p-2", "name": "Beacon", "portfolioId": "pf-1",
              "releaseNotes": [{ "id": "rn-1", "month": "Apr", "year": 2025,
                                 "version": 1, "link": "https://notes" }] }
        ]
    }"#;

    #[test]
    fn bad_product_is_quarantined_alone() {
        let catalog = decode_catalog(ONE_BAD_PRODUCT).unwrap();

        assert_eq!(catalog.product("p-1").unwrap().name, "Atlas");
        assert!(catalog.product("p-2").is_none());

        let rejected = catalog.rejected("p-2").unwrap();
        assert!(rejected.reason.contains("Apr"));
        assert!(matches!(
            rejected.error(),
            CodecError::MalformedProduct { id, .. } if id == "p-2"
        ));
        assert!(!catalog.is_empty());
    }

    #[test]
    fn rejected_products_survive_reencoding() {
        let mut catalog = decode_catalog(ONE_BAD_PRODUCT).unwrap();
        catalog.product_mut("p-1").unwrap().name = "Atlas 2".into();

        let encoded = encode_catalog(&catalog).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["products"][1]["releaseNotes"][0]["month"], "Apr");

        let mut again = decode_catalog(&encoded).unwrap();
        assert_eq!(again.product("p-1").unwrap().name, "Atlas 2");
        assert_eq!(again.rejected_products().len(), 1);
        assert!(again
            .insert_product(Product::new("p-2", "Clash", "pf-1"))
            .is_err());
    }

    #[test]
    fn insert_product_joins_portfolio() {
        let mut catalog = Catalog::new();
        catalog
            .insert_portfolio(Portfolio {
                id: "pf-1".into(),
                name: "Platform".into(),
                product_ids: Vec::new(),
            })
            .unwrap();
        catalog
            .insert_product(Product::new("p-1", "Atlas", "pf-1"))
            .unwrap();

        assert_eq!(catalog.portfolio("pf-1").unwrap().product_ids, ["p-1"]);
        assert!(catalog
            .insert_product(Product::new("p-1", "Again", "pf-1"))
            .is_err());
    }
}
