//! Scope filter
//!
//! Narrows a document collection to one time scope.

use crate::scope::ScopedDocument;

/// Documents whose scope fields equal `scope`, in input order
///
/// Never fails; an empty result means nothing was published for the period.
#[must_use]
pub fn filter_scope<'a, T: ScopedDocument>(items: &'a [T], scope: &T::Scope) -> Vec<&'a T> {
    items.iter().filter(|item| item.in_scope(scope)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{ReleaseNote, Roadmap};
    use crate::scope::{MonthScope, YearScope};
    use crate::version::DocVersion;

    fn note(id: &str, month: u8, year: i32) -> ReleaseNote {
        ReleaseNote {
            id: id.to_string(),
            month,
            year,
            version: DocVersion::from_major(1),
            link: format!("https://notes.example.com/{id}"),
            created_at: None,
        }
    }

    #[test]
    fn month_scope_requires_both_fields() {
        let notes = vec![
            note("a", 4, 2025),
            note("b", 4, 2024),
            note("c", 5, 2025),
            note("d", 4, 2025),
        ];
        let scope = MonthScope::new(4, 2025).unwrap();

        let ids: Vec<_> = filter_scope(&notes, &scope)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "d"]);
    }

    #[test]
    fn year_scope_ignores_nothing_else() {
        let roadmaps = vec![Roadmap {
            id: "r-1".into(),
            year: 2025,
            version: DocVersion::from_major(1),
            link: "https://example.com/r".into(),
            created_at: None,
        }];

        assert_eq!(filter_scope(&roadmaps, &YearScope::new(2025)).len(), 1);
        assert!(filter_scope(&roadmaps, &YearScope::new(2024)).is_empty());
    }

    #[test]
    fn empty_collection_yields_empty() {
        let notes: Vec<ReleaseNote> = Vec::new();
        let scope = MonthScope::new(1, 2025).unwrap();
        assert!(filter_scope(&notes, &scope).is_empty());
    }
}
