//! Document writer
//!
//! Persists new document versions: read the catalog, append to one product
//! collection, write the whole catalog back conditionally on the revision
//! that was read, then raise the in-context signal so this context's own
//! consumers re-derive. Other contexts learn of the write through the
//! store's cross-context broadcast.

use crate::bus::{ChangeBus, Signal};
use crate::codec::{decode_catalog, encode_catalog, Catalog};
use crate::config::{DocketConfig, DEFAULT_CATALOG_KEY};
use crate::error::WriteError;
use crate::store::{DocumentStore, Revision};
use chrono::Utc;
use docket_model::{
    next_version, Document, GoalItem, MonthScope, PlanItem, Product, ReleaseGoal, ReleaseNote,
    ReleasePlan, Roadmap, YearScope,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use ulid::Ulid;

/// Caller capability, checked before any write
///
/// Role lookup happens outside this crate; the writer only consumes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read only
    #[default]
    Viewer,
    /// May publish documents
    Editor,
    /// May publish documents and replace the catalog
    Admin,
}

impl Role {
    /// Whether documents may be written
    #[inline]
    #[must_use]
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Editor | Self::Admin)
    }

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?}, expected viewer, editor or admin")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Appends document versions and announces them
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    store: Arc<dyn DocumentStore>,
    bus: ChangeBus,
    catalog_key: String,
    role: Role,
}

impl DocumentWriter {
    /// Create writer for the default catalog key
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, bus: ChangeBus, role: Role) -> Self {
        Self {
            store,
            bus,
            catalog_key: DEFAULT_CATALOG_KEY.to_string(),
            role,
        }
    }

    /// Create writer using the configured catalog key
    #[inline]
    #[must_use]
    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        bus: ChangeBus,
        role: Role,
        config: &DocketConfig,
    ) -> Self {
        Self::new(store, bus, role).with_catalog_key(config.catalog_key.clone())
    }

    /// With catalog key
    #[inline]
    #[must_use]
    pub fn with_catalog_key(mut self, key: impl Into<String>) -> Self {
        self.catalog_key = key.into();
        self
    }

    /// Role writes are performed as
    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Append an already-built document to a product
    ///
    /// # Errors
    /// - `WriteError::Forbidden` if the role may not write
    /// - `WriteError::ProductNotFound` if the product is absent
    /// - `WriteError::Malformed` if the catalog or this product fails to decode
    /// - `WriteError::Model` if the id is taken in that scope
    /// - `WriteError::Stale` if the catalog changed since it was read
    pub async fn append(
        &self,
        product_id: &str,
        document: Document,
    ) -> Result<Revision, WriteError> {
        let kind = document.kind();
        let ((), revision) = self
            .commit(Some(product_id), |catalog| {
                product_in(catalog, product_id)?.append(document)?;
                Ok(())
            })
            .await?;
        tracing::info!(product_id, %kind, %revision, "appended document");
        Ok(revision)
    }

    /// Publish the next roadmap version for a year
    ///
    /// # Errors
    /// As [`DocumentWriter::append`]
    pub async fn publish_roadmap(
        &self,
        product_id: &str,
        scope: YearScope,
        link: impl Into<String>,
    ) -> Result<Roadmap, WriteError> {
        let link = link.into();
        let (roadmap, revision) = self
            .commit(Some(product_id), |catalog| {
                let product = product_in(catalog, product_id)?;
                let roadmap = Roadmap {
                    id: mint_id(),
                    year: scope.year,
                    version: next_version(product.roadmaps_in(&scope)),
                    link,
                    created_at: Some(Utc::now()),
                };
                product.append(Document::Roadmap(roadmap.clone()))?;
                Ok(roadmap)
            })
            .await?;
        tracing::info!(product_id, version = %roadmap.version, %revision, "published roadmap");
        Ok(roadmap)
    }

    /// Publish the next release goal version for a month
    ///
    /// # Errors
    /// As [`DocumentWriter::append`]
    pub async fn publish_release_goal(
        &self,
        product_id: &str,
        scope: MonthScope,
        goals: Vec<GoalItem>,
    ) -> Result<ReleaseGoal, WriteError> {
        let (goal, revision) = self
            .commit(Some(product_id), |catalog| {
                let product = product_in(catalog, product_id)?;
                let goal = ReleaseGoal {
                    id: mint_id(),
                    month: scope.month(),
                    year: scope.year(),
                    version: next_version(product.release_goals_in(&scope)),
                    goals,
                };
                product.append(Document::ReleaseGoal(goal.clone()))?;
                Ok(goal)
            })
            .await?;
        tracing::info!(
            product_id,
            %scope,
            version = %goal.version,
            %revision,
            "published release goals"
        );
        Ok(goal)
    }

    /// Publish the next release plan version for a month
    ///
    /// # Errors
    /// As [`DocumentWriter::append`]
    pub async fn publish_release_plan(
        &self,
        product_id: &str,
        scope: MonthScope,
        items: Vec<PlanItem>,
    ) -> Result<ReleasePlan, WriteError> {
        let (plan, revision) = self
            .commit(Some(product_id), |catalog| {
                let product = product_in(catalog, product_id)?;
                let plan = ReleasePlan {
                    id: mint_id(),
                    month: scope.month(),
                    year: scope.year(),
                    version: next_version(product.release_plans_in(&scope)),
                    items,
                };
                product.append(Document::ReleasePlan(plan.clone()))?;
                Ok(plan)
            })
            .await?;
        tracing::info!(
            product_id,
            %scope,
            version = %plan.version,
            %revision,
            "published release plan"
        );
        Ok(plan)
    }

    /// Publish the next release notes version for a month
    ///
    /// # Errors
    /// As [`DocumentWriter::append`]
    pub async fn publish_release_note(
        &self,
        product_id: &str,
        scope: MonthScope,
        link: impl Into<String>,
    ) -> Result<ReleaseNote, WriteError> {
        let link = link.into();
        let (note, revision) = self
            .commit(Some(product_id), |catalog| {
                let product = product_in(catalog, product_id)?;
                let note = ReleaseNote {
                    id: mint_id(),
                    month: scope.month(),
                    year: scope.year(),
                    version: next_version(product.release_notes_in(&scope)),
                    link,
                    created_at: Some(Utc::now()),
                };
                product.append(Document::ReleaseNote(note.clone()))?;
                Ok(note)
            })
            .await?;
        tracing::info!(
            product_id,
            %scope,
            version = %note.version,
            %revision,
            "published release notes"
        );
        Ok(note)
    }

    /// Replace the whole catalog (seeding, imports)
    ///
    /// Unconditional: the last writer wins. Only admins may do this.
    ///
    /// # Errors
    /// - `WriteError::Forbidden` unless the role is admin
    /// - `WriteError::Store` if the store cannot be written
    pub async fn replace_catalog(&self, catalog: &Catalog) -> Result<Revision, WriteError> {
        if self.role != Role::Admin {
            return Err(WriteError::Forbidden(self.role));
        }
        let json = encode_catalog(catalog)?;
        let revision = self.store.put(&self.catalog_key, json).await?;
        self.bus.publish(Signal::catalog_updated());
        tracing::info!(
            products = catalog.products().len(),
            portfolios = catalog.portfolios().len(),
            %revision,
            "replaced catalog"
        );
        Ok(revision)
    }

    /// Read-modify-write of the catalog with optimistic concurrency
    async fn commit<T, F>(
        &self,
        product_id: Option<&str>,
        edit: F,
    ) -> Result<(T, Revision), WriteError>
    where
        F: FnOnce(&mut Catalog) -> Result<T, WriteError>,
    {
        if !self.role.can_write() {
            return Err(WriteError::Forbidden(self.role));
        }

        let (mut catalog, read) = match self.store.get(&self.catalog_key).await? {
            Some(stored) => match decode_catalog(&stored.value) {
                Ok(catalog) => (catalog, stored.revision),
                Err(err) => {
                    tracing::warn!(
                        key = %self.catalog_key,
                        revision = %stored.revision,
                        error = %err,
                        "malformed catalog in store, write refused"
                    );
                    return Err(WriteError::Malformed(err));
                }
            },
            None => (Catalog::new(), Revision::ZERO),
        };

        let output = edit(&mut catalog)?;
        let json = encode_catalog(&catalog)?;
        let revision = match self.store.put_if(&self.catalog_key, json, read).await {
            Ok(revision) => revision,
            Err(err) => {
                let err = WriteError::from(err);
                if err.is_stale() {
                    tracing::warn!(
                        key = %self.catalog_key,
                        %read,
                        error = %err,
                        "stale write rejected"
                    );
                }
                return Err(err);
            }
        };

        self.bus.publish(match product_id {
            Some(id) => Signal::product_data_updated(id),
            None => Signal::catalog_updated(),
        });
        Ok((output, revision))
    }
}

fn product_in<'a>(
    catalog: &'a mut Catalog,
    product_id: &str,
) -> Result<&'a mut Product, WriteError> {
    if let Some(rejected) = catalog.rejected(product_id) {
        return Err(WriteError::Malformed(rejected.error()));
    }
    catalog
        .product_mut(product_id)
        .ok_or_else(|| WriteError::ProductNotFound(product_id.to_string()))
}

fn mint_id() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}
