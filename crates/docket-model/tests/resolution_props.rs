use docket_model::{
    filter_scope, select_latest, versions_descending, DocVersion, MonthScope, ReleaseNote,
    Roadmap, ScopedDocument, YearScope,
};
use proptest::prelude::*;

fn note_strategy() -> impl Strategy<Value = ReleaseNote> {
    (1u8..=12, 2023i32..=2026, prop::collection::vec(0u64..20, 1..4), "[a-z]{4}").prop_map(
        |(month, year, segments, id)| {
            let raw = segments
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            ReleaseNote {
                id,
                month,
                year,
                version: DocVersion::parse(&raw).unwrap(),
                link: "https://notes.example.com".to_string(),
                created_at: None,
            }
        },
    )
}

#[test]
fn dotted_versions_beat_shorter_lexical_neighbours() {
    let make = |id: &str, version: &str| Roadmap {
        id: id.to_string(),
        year: 2025,
        version: DocVersion::parse(version).unwrap(),
        link: String::new(),
        created_at: None,
    };

    let over_two = vec![make("a", "1.2"), make("b", "1.10")];
    let over_nine = vec![make("b", "1.10"), make("c", "1.9")];

    assert_eq!(select_latest(&over_two).unwrap().id, "b");
    assert_eq!(select_latest(&over_nine).unwrap().id, "b");
    assert_eq!(
        filter_scope(&over_two, &YearScope::new(2025)).len(),
        over_two.len()
    );
}

proptest! {
    #[test]
    fn filter_has_no_false_positives_or_negatives(
        notes in prop::collection::vec(note_strategy(), 0..40),
        month in 1u8..=12,
        year in 2023i32..=2026,
    ) {
        let scope = MonthScope::new(month, year).unwrap();
        let kept = filter_scope(&notes, &scope);

        for note in &kept {
            prop_assert!(note.month == month && note.year == year);
        }
        let expected = notes.iter().filter(|n| n.in_scope(&scope)).count();
        prop_assert_eq!(kept.len(), expected);
    }

    #[test]
    fn filter_preserves_input_order(
        notes in prop::collection::vec(note_strategy(), 0..40),
        month in 1u8..=12,
    ) {
        let scope = MonthScope::new(month, 2025).unwrap();
        let kept = filter_scope(&notes, &scope);

        let positions: Vec<usize> = kept
            .iter()
            .map(|k| notes.iter().position(|n| std::ptr::eq(n, *k)).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn latest_is_at_least_every_other_version(
        notes in prop::collection::vec(note_strategy(), 1..40),
    ) {
        let latest = select_latest(&notes).unwrap();
        for note in &notes {
            prop_assert!(latest.version >= note.version);
        }
        prop_assert!(std::ptr::eq(latest, versions_descending(&notes)[0]));
    }
}
