//! Output types: the structured breakdown returned by the pipeline.
//!
//! [`BudgetBreakdown`] is the root aggregate. It is assembled once by the
//! orchestrator and immutable thereafter; re-running the pipeline on the
//! same input produces a byte-identical value. For that reason the embedded
//! [`ExtractStats`] carry only deterministic counters — wall-clock timings
//! are emitted through `tracing` instead of being stored in the result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which strategy produced the final item set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Item-only-block strategy ("strict mode"): authoritative when it
    /// yields anything at all.
    ItemBlock,
    /// Row-scanning fallback family.
    RowScan,
    /// Positional-clustering fallback over per-fragment coordinates.
    Positional,
    /// No strategy produced items (empty or unrecognisable input).
    Empty,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::ItemBlock => "item_block",
            ExtractionMode::RowScan => "row_scan",
            ExtractionMode::Positional => "positional",
            ExtractionMode::Empty => "empty",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recognised (description, amount) cost row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Sequential 1-based index, assigned after deduplication.
    pub id: usize,
    /// Cleaned description text.
    pub title: String,
    /// Monetary amount; always > 0.
    pub amount: f64,
    /// Name of the strategy that produced this item.
    pub strategy: String,
    /// 0-based index of the line the item was recognised on.
    pub origin_line: usize,
}

/// A top-level lettered/numbered section and its subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Single letter, numeral, or roman-numeral label ("A", "10", "IV").
    pub id: String,
    /// Header title text.
    pub title: String,
    /// Section subtotal; always > 0.
    pub amount: f64,
    /// 0-based index of the header line.
    pub origin_line: usize,
}

/// Deterministic run counters (no wall-clock values).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Lines in the flattened text after normalisation.
    pub lines_scanned: usize,
    /// Pages whose fragments were clustered (0 unless the positional
    /// fallback ran).
    pub pages_clustered: usize,
    /// Item candidates considered before deduplication.
    pub candidates: usize,
}

/// The structured breakdown of one budget document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    /// Strategy that produced `items`.
    pub mode: ExtractionMode,
    /// Top-level sections in natural id order.
    pub sections: Vec<Section>,
    /// Deduplicated line items in document order.
    pub items: Vec<LineItem>,
    /// Exact sum of section amounts.
    pub section_total: f64,
    /// Exact sum of item amounts.
    pub row_sum: f64,
    /// Grand total; always equals `row_sum` exactly.
    pub total_all: f64,
    /// Human-readable one-liner: winning strategy plus item/section counts.
    pub confidence: String,
    /// Deterministic run counters.
    pub stats: ExtractStats,
}

impl BudgetBreakdown {
    /// The result for an empty or unrecognisable document. Not an error:
    /// a budget with nothing extractable is a valid (if disappointing)
    /// outcome.
    pub fn empty() -> Self {
        Self::assemble(ExtractionMode::Empty, Vec::new(), Vec::new(), ExtractStats::default())
    }

    /// Assemble the final aggregate, computing totals and the confidence
    /// summary from the (already deduplicated) sections and items.
    pub(crate) fn assemble(
        mode: ExtractionMode,
        sections: Vec<Section>,
        items: Vec<LineItem>,
        stats: ExtractStats,
    ) -> Self {
        let section_total: f64 = sections.iter().map(|s| s.amount).sum();
        let row_sum: f64 = items.iter().map(|i| i.amount).sum();
        let confidence = format!(
            "{}: {} items, {} sections",
            mode.as_str(),
            items.len(),
            sections.len()
        );
        Self {
            mode,
            sections,
            items,
            section_total,
            row_sum,
            total_all: row_sum,
            confidence,
            stats,
        }
    }
}

/// Document metadata, as reported by the PDF decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: usize, title: &str, amount: f64) -> LineItem {
        LineItem {
            id,
            title: title.to_string(),
            amount,
            strategy: "row_scan".to_string(),
            origin_line: id,
        }
    }

    #[test]
    fn empty_breakdown_has_zero_totals() {
        let b = BudgetBreakdown::empty();
        assert_eq!(b.mode, ExtractionMode::Empty);
        assert!(b.items.is_empty());
        assert_eq!(b.total_all, 0.0);
        assert_eq!(b.section_total, 0.0);
    }

    #[test]
    fn total_all_is_exact_item_sum() {
        let items = vec![item(1, "Cement", 45_000.0), item(2, "Rebar", 125_000.5)];
        let b = BudgetBreakdown::assemble(
            ExtractionMode::RowScan,
            Vec::new(),
            items,
            ExtractStats::default(),
        );
        assert_eq!(b.total_all, 45_000.0 + 125_000.5);
        assert_eq!(b.row_sum, b.total_all);
    }

    #[test]
    fn confidence_names_winning_strategy() {
        let b = BudgetBreakdown::assemble(
            ExtractionMode::ItemBlock,
            Vec::new(),
            vec![item(1, "Formwork", 9_000.0)],
            ExtractStats::default(),
        );
        assert_eq!(b.confidence, "item_block: 1 items, 0 sections");
    }

    #[test]
    fn breakdown_round_trips_through_json() {
        let b = BudgetBreakdown::assemble(
            ExtractionMode::Positional,
            vec![Section {
                id: "A".into(),
                title: "Site Works".into(),
                amount: 250_000.0,
                origin_line: 3,
            }],
            vec![item(1, "Mobilization", 250_000.0)],
            ExtractStats {
                lines_scanned: 40,
                pages_clustered: 2,
                candidates: 3,
            },
        );
        let json = serde_json::to_string(&b).unwrap();
        let back: BudgetBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(json.contains("\"positional\""));
    }
}
