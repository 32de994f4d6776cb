//! Time-scoped product documents
//!
//! Every document kind has one explicit shape. Versioned kinds implement
//! [`Versioned`]; all kinds implement [`ScopedDocument`].

use crate::legacy;
use crate::scope::{MonthScope, ScopedDocument, YearScope};
use crate::version::DocVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Document with a comparable version
pub trait Versioned {
    /// Document id, unique within its product, collection and scope
    fn id(&self) -> &str;

    /// Published version
    fn version(&self) -> &DocVersion;
}

/// Kinds of documents held by a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// Yearly roadmap link
    Roadmap,
    /// Monthly release goals
    ReleaseGoal,
    /// Monthly release plan
    ReleasePlan,
    /// Monthly metric reading
    Metric,
    /// Monthly release notes link
    ReleaseNote,
}

impl DocumentKind {
    /// All kinds in display order
    pub const ALL: [Self; 5] = [
        Self::Roadmap,
        Self::ReleaseGoal,
        Self::ReleasePlan,
        Self::Metric,
        Self::ReleaseNote,
    ];

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roadmap => "roadmap",
            Self::ReleaseGoal => "releaseGoal",
            Self::ReleasePlan => "releasePlan",
            Self::Metric => "metric",
            Self::ReleaseNote => "releaseNote",
        }
    }

    /// Whether the kind is reduced to a latest version
    ///
    /// Metrics are not versioned; every metric in scope is shown.
    #[inline]
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        !matches!(self, Self::Metric)
    }

    /// Whether the kind is scoped by year alone
    #[inline]
    #[must_use]
    pub fn is_yearly(&self) -> bool {
        matches!(self, Self::Roadmap)
    }
}

impl Display for DocumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yearly roadmap document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub id: String,
    #[serde(deserialize_with = "legacy::year")]
    pub year: i32,
    pub version: DocVersion,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScopedDocument for Roadmap {
    type Scope = YearScope;

    fn in_scope(&self, scope: &YearScope) -> bool {
        self.year == scope.year
    }
}

impl Versioned for Roadmap {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &DocVersion {
        &self.version
    }
}

/// One goal within a release goal document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub current_state: String,
    #[serde(default)]
    pub target_state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub category: String,
}

/// Monthly release goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseGoal {
    pub id: String,
    #[serde(deserialize_with = "legacy::month")]
    pub month: u8,
    #[serde(deserialize_with = "legacy::year")]
    pub year: i32,
    pub version: DocVersion,
    #[serde(default, deserialize_with = "legacy::goal_items")]
    pub goals: Vec<GoalItem>,
}

/// One item within a release plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: String,
}

/// Monthly release plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlan {
    pub id: String,
    #[serde(deserialize_with = "legacy::month")]
    pub month: u8,
    #[serde(deserialize_with = "legacy::year")]
    pub year: i32,
    pub version: DocVersion,
    #[serde(default, deserialize_with = "legacy::plan_items")]
    pub items: Vec<PlanItem>,
}

/// Monthly metric reading (not versioned)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    #[serde(deserialize_with = "legacy::month")]
    pub month: u8,
    #[serde(deserialize_with = "legacy::year")]
    pub year: i32,
    pub name: String,
    #[serde(deserialize_with = "legacy::number")]
    pub value: f64,
    #[serde(
        default,
        deserialize_with = "legacy::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub monthly_target: Option<f64>,
    #[serde(
        default,
        deserialize_with = "legacy::optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub annual_target: Option<f64>,
}

/// Monthly release notes link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNote {
    pub id: String,
    #[serde(deserialize_with = "legacy::month")]
    pub month: u8,
    #[serde(deserialize_with = "legacy::year")]
    pub year: i32,
    pub version: DocVersion,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

macro_rules! monthly_document {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ScopedDocument for $ty {
                type Scope = MonthScope;

                fn in_scope(&self, scope: &MonthScope) -> bool {
                    self.month == scope.month() && self.year == scope.year()
                }
            }
        )+
    };
}

monthly_document!(ReleaseGoal, ReleasePlan, Metric, ReleaseNote);

macro_rules! versioned_document {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Versioned for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn version(&self) -> &DocVersion {
                    &self.version
                }
            }
        )+
    };
}

versioned_document!(ReleaseGoal, ReleasePlan, ReleaseNote);

/// Any product document, tagged by kind
///
/// Used when a caller appends a new document without knowing its
/// collection statically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "document", rename_all = "camelCase")]
pub enum Document {
    Roadmap(Roadmap),
    ReleaseGoal(ReleaseGoal),
    ReleasePlan(ReleasePlan),
    Metric(Metric),
    ReleaseNote(ReleaseNote),
}

impl Document {
    /// Kind of the wrapped document
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Roadmap(_) => DocumentKind::Roadmap,
            Self::ReleaseGoal(_) => DocumentKind::ReleaseGoal,
            Self::ReleasePlan(_) => DocumentKind::ReleasePlan,
            Self::Metric(_) => DocumentKind::Metric,
            Self::ReleaseNote(_) => DocumentKind::ReleaseNote,
        }
    }

    /// Id of the wrapped document
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Roadmap(d) => &d.id,
            Self::ReleaseGoal(d) => &d.id,
            Self::ReleasePlan(d) => &d.id,
            Self::Metric(d) => &d.id,
            Self::ReleaseNote(d) => &d.id,
        }
    }

    /// Version of the wrapped document, if the kind is versioned
    #[must_use]
    pub fn version(&self) -> Option<&DocVersion> {
        match self {
            Self::Roadmap(d) => Some(&d.version),
            Self::ReleaseGoal(d) => Some(&d.version),
            Self::ReleasePlan(d) => Some(&d.version),
            Self::ReleaseNote(d) => Some(&d.version),
            Self::Metric(_) => None,
        }
    }
}
