//! Recognition strategies and the chain that orders them.
//!
//! Each strategy is one heuristic for recovering (description, amount)
//! pairs from a flattened budget document. All implement [`Strategy`], so
//! the orchestrator can hold them as an ordered list and apply a
//! declarative [`SelectionPolicy`] per entry instead of hand-written nested
//! conditionals — adding or reordering a strategy touches the chain
//! definition, nothing else.
//!
//! ## Chain order
//!
//! ```text
//! item_block   Authoritative      strict description-block + amount-line
//! row_scan     FirstNonEmpty      four single/multi-line heuristics merged
//! positional   BackstopKeepLarger rows rebuilt from positioned fragments
//! ```

pub mod blocks;
pub mod clusters;
pub mod rows;
pub mod sections;

use crate::config::ExtractConfig;
use crate::pipeline::document::Document;
use once_cell::sync::Lazy;
use regex::Regex;

/// One pre-dedup (description, amount) candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub amount: f64,
    /// 0-based line (or synthetic-row) index the candidate came from.
    pub origin_line: usize,
}

/// A recognition heuristic over one [`Document`].
pub trait Strategy: Send + Sync {
    /// Stable tag recorded on every item this strategy produces.
    fn name(&self) -> &'static str;

    /// Run the heuristic. Must not panic on malformed input; lines it
    /// cannot read contribute nothing.
    fn extract(&self, doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate>;
}

/// How the orchestrator treats one chain entry's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// A non-empty result wins outright and ends the chain.
    Authoritative,
    /// Used only if no earlier entry produced anything.
    FirstNonEmpty,
    /// Runs only when the current result is smaller than the configured
    /// floor; the larger of the two result sets is kept.
    BackstopKeepLarger,
}

/// Run the text-tier entries of a chain in order, returning the winning
/// strategy's name and candidates. `BackstopKeepLarger` entries are the
/// orchestrator's concern (they may require extra decoding) and are
/// skipped here.
pub fn run_text_chain(
    chain: &[(&dyn Strategy, SelectionPolicy)],
    doc: &Document,
    cfg: &ExtractConfig,
    mut observe: impl FnMut(&'static str, usize),
) -> Option<(&'static str, Vec<Candidate>)> {
    let mut winner: Option<(&'static str, Vec<Candidate>)> = None;

    for (strategy, policy) in chain {
        match policy {
            SelectionPolicy::Authoritative => {
                let found = strategy.extract(doc, cfg);
                observe(strategy.name(), found.len());
                if !found.is_empty() {
                    return Some((strategy.name(), found));
                }
            }
            SelectionPolicy::FirstNonEmpty => {
                if winner.is_none() {
                    let found = strategy.extract(doc, cfg);
                    observe(strategy.name(), found.len());
                    if !found.is_empty() {
                        winner = Some((strategy.name(), found));
                    }
                }
            }
            SelectionPolicy::BackstopKeepLarger => {}
        }
    }

    winner
}

// ── Shared vocabulary ────────────────────────────────────────────────────

// Unit vocabulary seen in real bills of quantities. `m` must come last in
// the alternation so `m2`/`m3` win the leftmost-first race.
static RE_UNIT_QTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s*(?:lots?|sq\.?m|cu\.?m|m2|m3|pcs?|kgs?|bags?|sets?|units?|ea|l\.?s\.?|m)\b",
    )
    .unwrap()
});

static RE_UNIT_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:lots?|sq\.?m|cu\.?m|m2|m3|pcs?|kgs?|bags?|sets?|units?|ea|l\.?s\.?|m)$")
        .unwrap()
});

// Sub-item markers: "D.3", "A.10".
static RE_SUB_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]\.\d+\b").unwrap());

// Summary rows: "Total …", "Grand Total …", "Sub-total …". These carry
// aggregates of other rows, never an item of their own.
static RE_SUMMARY_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(grand\s+)?(sub\s*-?\s*)?total\b").unwrap());

/// Whether a title carries a quantity-with-unit pattern ("10 sqm", "2 lots"),
/// marking it as a detail row rather than a cost description block.
pub(crate) fn has_unit_quantity(title: &str) -> bool {
    RE_UNIT_QTY.is_match(title)
}

/// Whether one whitespace token is a bare unit word.
pub(crate) fn is_unit_token(token: &str) -> bool {
    RE_UNIT_WORD.is_match(token)
}

/// Whether a title references a sub-item ("D.3"), meaning it belongs under
/// a section rather than standing as a top-level item.
pub(crate) fn has_sub_item_marker(title: &str) -> bool {
    RE_SUB_ITEM.is_match(title)
}

/// Whether a line is a total/subtotal row. The fallback strategies skip
/// these — turning a grand total into an item would double-count the
/// entire document. (The section strategy still reads them, as subtotal
/// carriers for a header.)
pub(crate) fn is_summary_row(text: &str) -> bool {
    RE_SUMMARY_ROW.is_match(text)
}

/// Lines need at least this much alphabetic content to count as text.
pub(crate) fn alpha_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphabetic()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, usize);

    impl Strategy for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn extract(&self, _doc: &Document, _cfg: &ExtractConfig) -> Vec<Candidate> {
            (0..self.1)
                .map(|i| Candidate {
                    title: format!("item {i}"),
                    amount: 1000.0,
                    origin_line: i,
                })
                .collect()
        }
    }

    #[test]
    fn authoritative_nonempty_ends_chain() {
        let a = Fixed("primary", 2);
        let b = Fixed("fallback", 5);
        let chain: Vec<(&dyn Strategy, SelectionPolicy)> = vec![
            (&a, SelectionPolicy::Authoritative),
            (&b, SelectionPolicy::FirstNonEmpty),
        ];
        let doc = Document::from_text("x");
        let cfg = ExtractConfig::default();
        let (name, found) = run_text_chain(&chain, &doc, &cfg, |_, _| {}).unwrap();
        assert_eq!(name, "primary");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn empty_authoritative_falls_through() {
        let a = Fixed("primary", 0);
        let b = Fixed("fallback", 3);
        let chain: Vec<(&dyn Strategy, SelectionPolicy)> = vec![
            (&a, SelectionPolicy::Authoritative),
            (&b, SelectionPolicy::FirstNonEmpty),
        ];
        let doc = Document::from_text("x");
        let cfg = ExtractConfig::default();
        let (name, _) = run_text_chain(&chain, &doc, &cfg, |_, _| {}).unwrap();
        assert_eq!(name, "fallback");
    }

    #[test]
    fn all_empty_yields_none() {
        let a = Fixed("primary", 0);
        let chain: Vec<(&dyn Strategy, SelectionPolicy)> =
            vec![(&a, SelectionPolicy::Authoritative)];
        let doc = Document::from_text("x");
        let cfg = ExtractConfig::default();
        assert!(run_text_chain(&chain, &doc, &cfg, |_, _| {}).is_none());
    }

    #[test]
    fn unit_quantity_vocabulary() {
        assert!(has_unit_quantity("Gravel fill 10 cu.m"));
        assert!(has_unit_quantity("Cement 25 bags"));
        assert!(has_unit_quantity("Tiles 120 sqm"));
        assert!(has_unit_quantity("Rebar 500 kg"));
        assert!(!has_unit_quantity("CONCRETE REINFORCEMENT"));
        assert!(!has_unit_quantity("Phase 2 expansion"));
    }

    #[test]
    fn sub_item_markers() {
        assert!(has_sub_item_marker("D.3 Door jambs"));
        assert!(has_sub_item_marker("see A.10"));
        assert!(!has_sub_item_marker("3.5 tons"));
        assert!(!has_sub_item_marker("SITE WORKS"));
    }

    #[test]
    fn unit_tokens() {
        assert!(is_unit_token("sqm"));
        assert!(is_unit_token("pcs"));
        assert!(is_unit_token("M2"));
        assert!(!is_unit_token("cement"));
    }

    #[test]
    fn summary_rows() {
        assert!(is_summary_row("Total Amount 250,000.00"));
        assert!(is_summary_row("GRAND TOTAL 2,163,000.00"));
        assert!(is_summary_row("Sub-total 98,000.00"));
        assert!(!is_summary_row("Roofing works total 120,000.00"));
        assert!(!is_summary_row("Roofing works 120,000.00"));
    }
}
