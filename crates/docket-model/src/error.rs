//! Error types for the document model

use crate::documents::DocumentKind;

/// Model invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Same id used twice in one collection and scope
    #[error("duplicate {kind} id {id:?} in product {product_id}")]
    DuplicateDocumentId {
        /// Product holding the collection
        product_id: String,
        /// Collection kind
        kind: DocumentKind,
        /// Repeated id
        id: String,
    },
}
