//! Deduplication and final numbering of item candidates.
//!
//! Lossy flattening duplicates numbers: the same row can be detected twice
//! with different amounts (a partial amount from a torn column, the full
//! one from the total column). Grouping by title and keeping the larger
//! amount recovers the intended row in every observed case, because the
//! duplicate is always a truncation of the real value, never an inflation.
//!
//! Keys are the title with whitespace runs collapsed, case preserved.
//! Case-folding and punctuation stripping were considered and rejected:
//! budget rows legitimately differ only in a marking ("Type A" vs
//! "TYPE A" from different tables), and collapsing those loses real items.

use crate::output::LineItem;
use crate::pipeline::strategy::Candidate;
use crate::pipeline::titles::TitleCleaner;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Grouping key for one candidate title: trimmed, inner whitespace runs
/// collapsed.
pub fn title_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse duplicate candidates: one survivor per title key, the larger
/// amount wins, first-seen document order is preserved.
pub fn dedup_largest(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Candidate> = HashMap::new();

    for c in candidates {
        match by_key.entry(title_key(&c.title)) {
            Entry::Occupied(mut existing) => {
                if c.amount > existing.get().amount {
                    existing.insert(c);
                }
            }
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(c);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

/// Clean titles, drop non-positive amounts, and assign sequential ids.
pub fn number_items(
    candidates: Vec<Candidate>,
    strategy: &str,
    cleaner: &TitleCleaner,
) -> Vec<LineItem> {
    candidates
        .into_iter()
        .filter(|c| c.amount > 0.0)
        .enumerate()
        .map(|(i, c)| LineItem {
            id: i + 1,
            title: cleaner.clean(&c.title),
            amount: c.amount,
            strategy: strategy.to_string(),
            origin_line: c.origin_line,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(title: &str, amount: f64, line: usize) -> Candidate {
        Candidate {
            title: title.to_string(),
            amount,
            origin_line: line,
        }
    }

    #[test]
    fn duplicate_titles_keep_the_larger_amount() {
        let out = dedup_largest(vec![
            cand("Roofing works", 12_000.0, 3),
            cand("Roofing works", 120_000.0, 9),
            cand("Painting works", 45_000.0, 12),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].amount, 120_000.0);
        assert_eq!(out[0].origin_line, 9);
        assert_eq!(out[1].title, "Painting works");
    }

    #[test]
    fn max_survives_any_candidate_order() {
        let out = dedup_largest(vec![
            cand("Roofing works", 120_000.0, 3),
            cand("Roofing works", 12_000.0, 9),
            cand("Roofing works", 90_000.0, 11),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, 120_000.0);
    }

    #[test]
    fn whitespace_variants_collapse_to_one_key() {
        let out = dedup_largest(vec![
            cand("Roofing  works", 100.0, 1),
            cand(" Roofing works ", 200.0, 2),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, 200.0);
    }

    #[test]
    fn case_variants_stay_distinct() {
        let out = dedup_largest(vec![
            cand("ROOFING WORKS", 100.0, 1),
            cand("Roofing works", 200.0, 2),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let out = dedup_largest(vec![
            cand("B item", 1000.0, 5),
            cand("A item", 1000.0, 9),
            cand("B item", 2000.0, 11),
        ]);
        assert_eq!(out[0].title, "B item");
        assert_eq!(out[1].title, "A item");
    }

    #[test]
    fn numbering_is_sequential_and_cleaned() {
        let items = number_items(
            vec![
                cand("ENVIRONME NTAL COMPLIANCE", 50_000.0, 2),
                cand("Roofing works", 120_000.0, 7),
            ],
            "row_scan",
            &TitleCleaner::default(),
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].title, "ENVIRONMENTAL COMPLIANCE");
        assert_eq!(items[1].id, 2);
        assert_eq!(items[1].strategy, "row_scan");
    }

    #[test]
    fn non_positive_amounts_are_dropped() {
        let items = number_items(
            vec![cand("Credit note", -500.0, 1), cand("Roofing", 500.0, 2)],
            "row_scan",
            &TitleCleaner::default(),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].title, "Roofing");
    }
}
