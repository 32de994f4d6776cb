//! Time scopes for partitioning document collections
//!
//! Roadmaps are scoped by [`YearScope`]; goals, plans, metrics and release
//! notes by [`MonthScope`].

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Scope errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// Month outside 1..=12
    #[error("invalid month {0}, expected 1-12")]
    InvalidMonth(u8),
}

/// Year-only scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearScope {
    /// Calendar year
    pub year: i32,
}

impl YearScope {
    /// Create year scope
    #[inline]
    #[must_use]
    pub fn new(year: i32) -> Self {
        Self { year }
    }
}

impl Display for YearScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year)
    }
}

/// Month and year scope
///
/// Also serves as a consumer's active [`Period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMonthScope")]
pub struct MonthScope {
    // field order gives chronological Ord
    year: i32,
    month: u8,
}

/// Active reporting period of a consumer
pub type Period = MonthScope;

#[derive(Deserialize)]
struct RawMonthScope {
    year: i32,
    month: u8,
}

impl TryFrom<RawMonthScope> for MonthScope {
    type Error = ScopeError;

    fn try_from(raw: RawMonthScope) -> Result<Self, Self::Error> {
        Self::new(raw.month, raw.year)
    }
}

impl MonthScope {
    /// Create month scope
    ///
    /// # Errors
    /// Returns `ScopeError::InvalidMonth` unless `month` is 1-12
    pub fn new(month: u8, year: i32) -> Result<Self, ScopeError> {
        if !(1..=12).contains(&month) {
            return Err(ScopeError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// Month (1-12)
    #[inline]
    #[must_use]
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Calendar year
    #[inline]
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Year scope containing this month
    #[inline]
    #[must_use]
    pub fn year_scope(&self) -> YearScope {
        YearScope::new(self.year)
    }

    /// Following month
    #[must_use]
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Preceding month
    #[must_use]
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Month containing the given date
    #[must_use]
    pub fn containing(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        // chrono months are always 1-12
        Self {
            year: date.year(),
            month: u8::try_from(date.month()).unwrap_or(1),
        }
    }
}

impl Display for MonthScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Document partitioned by a time scope
pub trait ScopedDocument {
    /// Scope type used to partition this document kind
    type Scope;

    /// Exact match on the scope fields
    fn in_scope(&self, scope: &Self::Scope) -> bool;
}
