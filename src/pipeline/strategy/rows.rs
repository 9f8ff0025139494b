//! Row-scanning fallback family: four independent single/multi-line
//! heuristics, merged.
//!
//! These run only when the item-block strategy found nothing — i.e. the
//! document kept amounts on (or next to) their description lines. Each
//! sub-strategy targets one surviving layout:
//!
//! 1. description and exactly one money token on the same line;
//! 2. description line, standalone amount on the next line;
//! 3. description with a money-shaped trailing token big enough to be a
//!    total, ignoring earlier numeric columns (qty × rate);
//! 4. rows with two or more money tokens, last one read as the total.
//!
//! Sub-strategies overlap by design: the same physical row may satisfy
//! several of them, so the merged output is deduplicated by
//! (title, amount) before it leaves this module.

use crate::config::ExtractConfig;
use crate::pipeline::document::{Document, TextLine};
use crate::pipeline::scan;
use std::collections::HashSet;

use super::{alpha_count, is_summary_row, Candidate, Strategy};

pub struct RowScan;

impl Strategy for RowScan {
    fn name(&self) -> &'static str {
        "row_scan"
    }

    fn extract(&self, doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate> {
        let mut merged: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<(String, u64)> = HashSet::new();

        let sub_results = [
            single_token_rows(doc),
            next_line_amounts(doc, cfg),
            loose_trailing_totals(doc, cfg),
            multi_number_rows(doc),
        ];

        for found in sub_results {
            for c in found {
                let key = (c.title.clone(), c.amount.to_bits());
                if seen.insert(key) {
                    merged.push(c);
                }
            }
        }

        merged.sort_by_key(|c| c.origin_line);
        merged
    }
}

/// Whether a line can yield an item: enough letters to be a description,
/// and not a total/subtotal row (those aggregate other rows).
fn is_texty(line: &TextLine) -> bool {
    alpha_count(&line.text) >= 2 && !is_summary_row(&line.text)
}

/// 1. Alphabetic line with exactly one money token.
fn single_token_rows(doc: &Document) -> Vec<Candidate> {
    let mut found = Vec::new();
    for line in &doc.lines {
        if !is_texty(line) {
            continue;
        }
        let tokens = scan::scan_money(&line.text);
        if tokens.len() != 1 || tokens[0].value <= 0.0 {
            continue;
        }
        let title = scan::strip_money(&line.text);
        if alpha_count(&title) >= 2 {
            found.push(Candidate {
                title,
                amount: tokens[0].value,
                origin_line: line.index,
            });
        }
    }
    found
}

/// 2. Description line followed by a standalone amount line.
fn next_line_amounts(doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate> {
    let mut found = Vec::new();
    for pair in doc.lines.windows(2) {
        let (desc, amount_line) = (&pair[0], &pair[1]);
        if !is_texty(desc) || !scan::scan_money(&desc.text).is_empty() {
            continue;
        }
        if !scan::is_pure_number(&amount_line.text) {
            continue;
        }
        let Some(value) = scan::parse_amount(&amount_line.text) else {
            continue;
        };
        if value <= 0.0 {
            continue;
        }
        if amount_line.text.contains(',') || value >= cfg.min_standalone_amount {
            found.push(Candidate {
                title: desc.text.clone(),
                amount: value,
                origin_line: desc.index,
            });
        }
    }
    found
}

/// 3. Loose last-token-as-total: the trailing token is money-shaped and
/// large; whatever numeric columns precede it (qty, rate) are ignored for
/// both the amount and the title.
fn loose_trailing_totals(doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate> {
    let mut found = Vec::new();
    for line in &doc.lines {
        if !is_texty(line) {
            continue;
        }
        let Some(trailing) = line.text.rsplit(' ').next() else {
            continue;
        };
        if !scan::is_money_shaped(trailing) {
            continue;
        }
        let Some(value) = scan::parse_amount(trailing) else {
            continue;
        };
        if value <= 0.0 || !(trailing.contains(',') || value >= cfg.min_loose_total) {
            continue;
        }
        let tokens = scan::scan_money(&line.text);
        let head = match tokens.first() {
            Some(first) => line.text[..first.start].trim_end(),
            None => &line.text,
        };
        let title = strip_leading_numeric_runs(head);
        if alpha_count(&title) >= 2 {
            found.push(Candidate {
                title,
                amount: value,
                origin_line: line.index,
            });
        }
    }
    found
}

/// 4. Multi-number rows: at least two money tokens, last is the total.
fn multi_number_rows(doc: &Document) -> Vec<Candidate> {
    let mut found = Vec::new();
    for line in &doc.lines {
        if !is_texty(line) {
            continue;
        }
        let tokens = scan::scan_money(&line.text);
        if tokens.len() < 2 {
            continue;
        }
        let Some(total) = tokens.last() else {
            continue;
        };
        if total.value <= 0.0 {
            continue;
        }
        // Everything left of the first money token is the description,
        // minus any leading qty/item-number runs.
        let head = line.text[..tokens[0].start].trim_end();
        let title = strip_leading_numeric_runs(head);
        if alpha_count(&title) >= 2 {
            found.push(Candidate {
                title,
                amount: total.value,
                origin_line: line.index,
            });
        }
    }
    found
}

/// Drop leading small plain-number tokens ("12", "3.5") from a title —
/// item numbers and quantities that survived at the front of the row.
fn strip_leading_numeric_runs(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let keep_from = tokens
        .iter()
        .position(|t| {
            t.parse::<f64>()
                .map(|v| v.abs() >= 100.0)
                .unwrap_or(true)
        })
        .unwrap_or(tokens.len());
    tokens[keep_from..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<Candidate> {
        RowScan.extract(&Document::from_text(text), &ExtractConfig::default())
    }

    #[test]
    fn single_line_item() {
        let found = run("Portland Cement Type 1    45,000.00");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Portland Cement Type 1");
        assert_eq!(found[0].amount, 45_000.0);
    }

    #[test]
    fn description_then_standalone_amount() {
        let found = run("Structural excavation works\n85,000.00");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Structural excavation works");
        assert_eq!(found[0].amount, 85_000.0);
        assert_eq!(found[0].origin_line, 0);
    }

    #[test]
    fn small_standalone_next_line_is_ignored() {
        assert!(run("Structural excavation works\n12").is_empty());
    }

    #[test]
    fn qty_rate_total_row_takes_trailing_total() {
        // Quantity and rate columns are skipped for the amount; the title
        // keeps only what precedes the first money token.
        let found = run("Gravel bedding 10 800.00 8,000.00");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, 8_000.0);
        assert_eq!(found[0].title, "Gravel bedding 10");
    }

    #[test]
    fn multi_number_row_strips_leading_numbers() {
        let found = run("12 Deformed bars grade 60 1,250.00 15,000.00");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Deformed bars grade 60");
        assert_eq!(found[0].amount, 15_000.0);
    }

    #[test]
    fn small_trailing_plain_token_is_not_a_total() {
        // 450.00 with no grouping is below the loose-total floor, but it is
        // still an exactly-one-token row for sub-strategy 1.
        let found = run("Handle set 450.00");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, 450.0);
    }

    #[test]
    fn overlapping_sub_strategies_deduplicate() {
        // Matches sub-strategies 1 and 3 with the same (title, amount).
        let found = run("Roofing works 120,000.00");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn numeric_only_lines_yield_nothing() {
        assert!(run("125,000.00\n450.00").is_empty());
    }

    #[test]
    fn summary_rows_are_not_items() {
        assert!(run("Grand Total 2,163,000.00").is_empty());
        assert!(run("Total Amount 250,000.00").is_empty());
        assert!(run("Sub-total carried forward 98,000.00").is_empty());
    }

    #[test]
    fn results_are_in_document_order() {
        let found = run("Roofing works 120,000.00\nfiller\nPainting works 45,000.00");
        assert_eq!(found.len(), 2);
        assert!(found[0].origin_line < found[1].origin_line);
    }
}
