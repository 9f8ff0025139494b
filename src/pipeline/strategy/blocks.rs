//! Item-only-block detection ("strict mode"): a description block followed,
//! possibly several near-blank lines later, by a standalone amount line.
//!
//! This is the layout produced when a two-column (description | amount)
//! table is flattened column-by-column: descriptions pile up, amounts land
//! far below. The scanner is an explicit two-state machine —
//!
//! ```text
//! Idle ── start line ──▶ InBlock ── plausible amount line ──▶ emit, Idle
//!                          │
//!                          ├─ foreign money token ──▶ abort, Idle
//!                          ├─ new code-prefixed line ─▶ abort, restart block
//!                          └─ window exhausted ──▶ abort, Idle
//! ```
//!
//! — so every abort-vs-continue-vs-accept edge is a single match arm
//! rather than nested loop/continue control flow.
//!
//! When this strategy yields anything at all it is authoritative: a
//! document in this layout feeds the looser row heuristics nothing but
//! fragments, so their output must not be mixed in.

use crate::config::ExtractConfig;
use crate::pipeline::document::{Document, TextLine};
use crate::pipeline::scan;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{
    alpha_count, has_sub_item_marker, has_unit_quantity, is_summary_row, Candidate, Strategy,
};

// CSI-style cost codes: two-digit groups, "03 50 00" or "02 41".
static RE_CSI_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}(?:\s\d{2}){1,2}\b").unwrap());

pub struct ItemBlocks;

enum State {
    Idle,
    InBlock(Block),
}

struct Block {
    start: usize,
    title_lines: Vec<String>,
    /// Non-blank lines consumed since the start line.
    seen: usize,
    /// All lines consumed since the start line, blanks included.
    span: usize,
}

impl Block {
    fn open(line: &TextLine) -> Self {
        Self {
            start: line.index,
            title_lines: vec![line.text.clone()],
            seen: 0,
            span: 0,
        }
    }
}

impl Strategy for ItemBlocks {
    fn name(&self) -> &'static str {
        "item_block"
    }

    fn extract(&self, doc: &Document, cfg: &ExtractConfig) -> Vec<Candidate> {
        let mut found = Vec::new();
        let mut state = State::Idle;

        for line in &doc.lines {
            state = match state {
                State::Idle => {
                    if is_block_start(&line.text) {
                        State::InBlock(Block::open(line))
                    } else {
                        State::Idle
                    }
                }
                State::InBlock(mut block) => {
                    block.span += 1;
                    if block.span > cfg.block_span_limit {
                        trace!(start = block.start, "block abandoned: span limit");
                        State::Idle
                    } else if line.is_blank() {
                        State::InBlock(block)
                    } else {
                        block.seen += 1;
                        step_block(block, line, cfg, &mut found)
                    }
                }
            };
        }

        found.retain(|c| keep_candidate(c));
        found
    }
}

/// One non-blank line while inside a block. Returns the next state,
/// pushing a candidate when the line closes the block as its amount.
fn step_block(
    block: Block,
    line: &TextLine,
    cfg: &ExtractConfig,
    found: &mut Vec<Candidate>,
) -> State {
    let text = &line.text;

    if scan::is_pure_number(text) {
        if let Some(amount) = plausible_amount(text, cfg) {
            found.push(Candidate {
                title: block.title_lines.join(" "),
                amount,
                origin_line: block.start,
            });
            return State::Idle;
        }
        // A bare small number is a quantity column value: not the amount,
        // not part of the description either. Scan on.
        return continue_or_abort(block, cfg);
    }

    if is_block_start_code(text) {
        // A fresh code before any amount: the current block lost its
        // amount column; the new code opens its own block.
        trace!(start = block.start, line = line.index, "block aborted by new code line");
        return State::InBlock(Block::open(line));
    }

    if !scan::scan_money(text).is_empty() {
        // An embedded money token means this region still has its amount
        // column inline; it belongs to the row heuristics, not to us.
        trace!(start = block.start, line = line.index, "block aborted: foreign money token");
        return State::Idle;
    }

    let mut block = block;
    block.title_lines.push(text.clone());
    continue_or_abort(block, cfg)
}

fn continue_or_abort(block: Block, cfg: &ExtractConfig) -> State {
    if block.seen >= cfg.block_lookahead {
        trace!(start = block.start, "block abandoned: lookahead exhausted");
        State::Idle
    } else {
        State::InBlock(block)
    }
}

/// A line can open a block if it is a cost-code line or a description:
/// some letters, no money on it.
fn is_block_start(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    is_block_start_code(text) || (alpha_count(text) >= 2 && scan::scan_money(text).is_empty())
}

fn is_block_start_code(text: &str) -> bool {
    RE_CSI_CODE.is_match(text)
}

/// A standalone number closes a block only when it is believable as money:
/// grouped, or at least the configured floor.
fn plausible_amount(text: &str, cfg: &ExtractConfig) -> Option<f64> {
    let value = scan::parse_amount(text)?;
    if value <= 0.0 {
        return None;
    }
    (text.contains(',') || value >= cfg.min_standalone_amount).then_some(value)
}

/// Second pass: blocks whose titles reveal a detail row — a sub-item
/// marker or a quantity-with-unit — are rejected; they sit under a section
/// and would double-count its subtotal. Total/subtotal blocks go for the
/// same reason.
fn keep_candidate(c: &Candidate) -> bool {
    if has_sub_item_marker(&c.title) || has_unit_quantity(&c.title) || is_summary_row(&c.title) {
        trace!(line = c.origin_line, title = %c.title, "block rejected by title filter");
        return false;
    }
    true
}
