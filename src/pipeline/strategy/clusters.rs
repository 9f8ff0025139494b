//! Positional clustering: rebuild logical rows from positioned fragments.
//!
//! Sequential text extraction merges or splits rows whenever the PDF's
//! internal draw order disagrees with the visual layout. The positioned
//! fragments don't lie: fragments of one visual row share (almost) one
//! vertical coordinate. Bucketing by rounded y, sorting each bucket left to
//! right, and joining the texts resurrects the rows the flattening
//! destroyed.
//!
//! This is the last-resort strategy — it only runs when the text tier came
//! up short — and it reads the noisiest input, so its amount floor is the
//! lowest of the family.

use crate::config::ExtractConfig;
use crate::pipeline::document::{Document, PageFragments};
use crate::pipeline::scan;
use std::collections::BTreeMap;
use tracing::debug;

use super::{alpha_count, is_summary_row, is_unit_token, Candidate, Strategy};

pub struct PositionalClustering;

impl Strategy for PositionalClustering {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn extract(&self, doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate> {
        let Some(pages) = doc.pages.as_deref() else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut row_index = 0usize;

        for page in pages.iter().take(cfg.positional_page_cap) {
            let rows = cluster_rows(page, cfg.row_y_tolerance);
            debug!(page = page.page, rows = rows.len(), "clustered synthetic rows");
            for row in rows {
                if let Some(candidate) = read_row(&row, row_index, cfg) {
                    found.push(candidate);
                }
                row_index += 1;
            }
        }
        found
    }
}

/// Bucket one page's fragments by rounded vertical coordinate, top of page
/// first, each row sorted left to right and joined into a synthetic line.
fn cluster_rows(page: &PageFragments, y_tolerance: f32) -> Vec<String> {
    // BTreeMap keys are bucketed y ascending; PDF y grows upward, so
    // iterate in reverse for top-down reading order.
    let mut buckets: BTreeMap<i64, Vec<(f32, &str)>> = BTreeMap::new();

    for frag in &page.fragments {
        if frag.text.trim().is_empty() {
            continue;
        }
        let key = (frag.y / y_tolerance).round() as i64;
        buckets.entry(key).or_default().push((frag.x, frag.text.trim()));
    }

    buckets
        .into_values()
        .rev()
        .map(|mut row| {
            row.sort_by(|a, b| a.0.total_cmp(&b.0));
            row.iter().map(|(_, t)| *t).collect::<Vec<_>>().join(" ")
        })
        .collect()
}

/// Read one synthetic row: the last believable money token is the amount,
/// the text before the first unit/numeric token (after at least two
/// leading textual tokens) is the title.
fn read_row(row: &str, row_index: usize, cfg: &ExtractConfig) -> Option<Candidate> {
    if is_summary_row(row) {
        return None;
    }
    let tokens = scan::scan_money(row);
    let amount = tokens
        .iter()
        .rev()
        .find(|t| t.is_grouped() || t.value >= cfg.min_positional_amount)?;
    if amount.value <= 0.0 {
        return None;
    }

    let title = title_before_cut(&row[..amount.start])?;
    Some(Candidate {
        title,
        amount: amount.value,
        origin_line: row_index,
    })
}

/// Title = tokens up to the cut point: the first unit word or bare number
/// that appears after at least two textual tokens.
fn title_before_cut(head: &str) -> Option<String> {
    let mut kept: Vec<&str> = Vec::new();
    let mut textual = 0usize;

    for token in head.split_whitespace() {
        let is_numeric = token.parse::<f64>().is_ok();
        if textual >= 2 && (is_numeric || is_unit_token(token)) {
            break;
        }
        if !is_numeric {
            textual += 1;
        }
        kept.push(token);
    }

    let title = kept.join(" ");
    (alpha_count(&title) >= 2).then_some(title)
}
