//! Version selector
//!
//! Picks the authoritative ("latest") document within a scoped collection.

use crate::documents::Versioned;
use crate::version::DocVersion;

/// Document with the greatest version
///
/// Ties on the maximum version resolve to the item encountered last in
/// input order. Returns `None` for an empty collection, which callers treat
/// as "nothing published yet".
#[must_use]
pub fn select_latest<'a, T, I>(items: I) -> Option<&'a T>
where
    T: Versioned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    // Iterator::max_by returns the last of several equal maxima
    items
        .into_iter()
        .max_by(|a, b| a.version().cmp(b.version()))
}

/// Documents ordered newest first
///
/// Consistent with [`select_latest`]: the first element is the one it selects.
#[must_use]
pub fn versions_descending<'a, T, I>(items: I) -> Vec<&'a T>
where
    T: Versioned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut ordered: Vec<&T> = items.into_iter().collect();
    ordered.reverse();
    // stable sort keeps later inputs ahead of earlier ties
    ordered.sort_by(|a, b| b.version().cmp(a.version()));
    ordered
}

/// Next whole version for a scoped collection
///
/// `1` when nothing has been published in the scope yet.
#[must_use]
pub fn next_version<'a, T, I>(items: I) -> DocVersion
where
    T: Versioned + 'a,
    I: IntoIterator<Item = &'a T>,
{
    select_latest(items).map_or_else(|| DocVersion::from_major(1), |d| d.version().next_major())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ReleaseGoal;
    use crate::documents::Roadmap;

    fn roadmap(id: &str, version: &str) -> Roadmap {
        Roadmap {
            id: id.to_string(),
            year: 2025,
            version: DocVersion::parse(version).unwrap(),
            link: format!("https://example.com/{id}"),
            created_at: None,
        }
    }

    fn goal(id: &str, version: u64) -> ReleaseGoal {
        ReleaseGoal {
            id: id.to_string(),
            month: 4,
            year: 2025,
            version: DocVersion::from_major(version),
            goals: Vec::new(),
        }
    }

    #[test]
    fn dotted_roadmap_versions_select_numerically() {
        let items = vec![roadmap("a", "1.2"), roadmap("b", "1.10"), roadmap("c", "1.9")];
        assert_eq!(select_latest(&items).unwrap().id, "b");
    }

    #[test]
    fn empty_selects_none() {
        let items: Vec<ReleaseGoal> = Vec::new();
        assert!(select_latest(&items).is_none());
    }

    #[test]
    fn ties_resolve_to_last_encountered() {
        let items = vec![goal("first", 2), goal("older", 1), goal("second", 2)];
        assert_eq!(select_latest(&items).unwrap().id, "second");
    }

    #[test]
    fn descending_order_matches_selection() {
        let items = vec![goal("first", 2), goal("older", 1), goal("second", 2)];
        let ids: Vec<_> = versions_descending(&items)
            .into_iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(ids, ["second", "first", "older"]);
    }

    #[test]
    fn next_version_counts_from_latest() {
        let items = vec![goal("a", 1), goal("b", 3)];
        assert_eq!(next_version(&items), DocVersion::from_major(4));

        let empty: Vec<ReleaseGoal> = Vec::new();
        assert_eq!(next_version(&empty), DocVersion::from_major(1));
    }
}
