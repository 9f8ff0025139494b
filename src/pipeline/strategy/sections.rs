//! Section-header detection: top-level lettered/numbered sections and
//! their subtotals.
//!
//! A header is a line like `A) SITE WORKS`, `10. PLUMBING`, or
//! `II - FINISHES`. The subtotal is preferably the last money token on the
//! header line itself; when the layout pushed it elsewhere, a bounded
//! forward scan picks the first plausible carrier: a purely numeric line,
//! a "total"/"amount" line, or a same-letter sub-item row.

use crate::config::ExtractConfig;
use crate::output::Section;
use crate::pipeline::document::Document;
use crate::pipeline::scan::{self, parse_amount};
use crate::pipeline::titles::TitleCleaner;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

use super::alpha_count;

// Single capital letter, 1-2 digit number, or multi-char roman numeral,
// then `)`, `.`, or `-`, then whitespace and a title. The mandatory
// whitespace keeps sub-items like "A.1 ..." from matching.
static RE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]|\d{1,2}|[IVXLCDM]{2,5})[).\-]\s+(.+)$").unwrap());

static RE_TOTAL_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(total|amount)\b").unwrap());

/// Parsed header line: id + title text.
struct Header<'a> {
    id: &'a str,
    title: &'a str,
}

fn parse_header(text: &str) -> Option<Header<'_>> {
    let caps = RE_HEADER.captures(text)?;
    let (id, title) = (caps.get(1)?.as_str(), caps.get(2)?.as_str());
    // A header labels something; a match whose "title" has almost no
    // letters is a stray numeric row.
    if alpha_count(title) < 2 {
        return None;
    }
    Some(Header { id, title })
}

/// Extract all sections from the document: detect headers, resolve
/// amounts, dedup by id (larger amount wins), apply the noise filter,
/// sort by natural id order.
pub fn extract_sections(doc: &Document, cfg: &ExtractConfig, cleaner: &TitleCleaner) -> Vec<Section> {
    let mut by_id: HashMap<String, Section> = HashMap::new();

    for (i, line) in doc.lines.iter().enumerate() {
        let Some(header) = parse_header(&line.text) else {
            continue;
        };
        let Some(amount) = resolve_amount(doc, i, header.id, cfg) else {
            debug!(line = i, id = header.id, "section header without amount");
            continue;
        };
        if amount <= 0.0 {
            continue;
        }

        // Money tokens on the header line are the subtotal column, not
        // part of the title.
        let section = Section {
            id: header.id.to_string(),
            title: cleaner.clean(&scan::strip_money(header.title)),
            amount,
            origin_line: i,
        };
        match by_id.entry(section.id.clone()) {
            // Section totals dwarf the incidental numbers that also follow
            // a header; the larger candidate is the subtotal.
            Entry::Occupied(mut existing) => {
                if section.amount > existing.get().amount {
                    existing.insert(section);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(section);
            }
        }
    }

    let mut sections: Vec<Section> = by_id.into_values().collect();
    apply_noise_filter(&mut sections, cfg);
    sections.sort_by(|a, b| natural_key(&a.id).cmp(&natural_key(&b.id)));
    sections
}

/// Amount for one header: last money token on the header line, else the
/// first acceptable carrier within the forward window (stopping at the
/// next header).
fn resolve_amount(doc: &Document, header_idx: usize, id: &str, cfg: &ExtractConfig) -> Option<f64> {
    let header = &doc.lines[header_idx];
    if let Some(tok) = scan::last_money(&header.text) {
        return Some(tok.value);
    }

    let sub_item_prefix = format!("{id}.");
    for line in doc
        .lines
        .iter()
        .skip(header_idx + 1)
        .take(cfg.section_lookahead)
    {
        if line.is_blank() {
            continue;
        }
        if parse_header(&line.text).is_some() {
            return None;
        }

        if scan::is_pure_number(&line.text) {
            return parse_amount(&line.text);
        }
        if RE_TOTAL_KEYWORD.is_match(&line.text) {
            if let Some(tok) = scan::last_money(&line.text) {
                return Some(tok.value);
            }
        }
        // Same-letter sub-item ("A.1 …"): its trailing amount stands in for
        // the section subtotal when nothing better appears.
        if line.text.starts_with(&sub_item_prefix) {
            if let Some(tok) = scan::last_money(&line.text) {
                return Some(tok.value);
            }
        }
    }
    None
}

/// Documents whose sections carry five-figure subtotals get their sub-1000
/// "sections" dropped — those are page numbers or quantities that happened
/// to follow a letter. Thresholds are calibration constants (see
/// [`ExtractConfig`]), not derived values.
fn apply_noise_filter(sections: &mut Vec<Section>, cfg: &ExtractConfig) {
    let strong = sections
        .iter()
        .filter(|s| s.amount >= cfg.strong_section_amount)
        .count();
    if strong >= cfg.strong_section_count {
        sections.retain(|s| s.amount >= cfg.weak_section_cutoff);
    }
}

// ── Natural id ordering ──────────────────────────────────────────────────

/// Sort key: numeric ids first, then roman, then alphabetic. A single
/// letter is always alphabetic — sequences A, B, C, D must not see C and D
/// jump ahead as roman hundreds — so roman classification needs ≥2 chars.
fn natural_key(id: &str) -> (u8, u32, String) {
    if let Ok(n) = id.parse::<u32>() {
        return (0, n, String::new());
    }
    if id.len() >= 2 {
        if let Some(v) = roman_value(id) {
            return (1, v, String::new());
        }
    }
    (2, 0, id.to_string())
}

/// Standard subtractive-pair roman decoding. Returns `None` when any
/// character is not a roman digit.
fn roman_value(s: &str) -> Option<u32> {
    let digits: Option<Vec<i64>> = s
        .chars()
        .map(|c| match c {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            'L' => Some(50),
            'C' => Some(100),
            'D' => Some(500),
            'M' => Some(1000),
            _ => None,
        })
        .collect();
    let digits = digits?;

    let mut total: i64 = 0;
    for (i, &d) in digits.iter().enumerate() {
        if digits.get(i + 1).is_some_and(|&next| d < next) {
            total -= d;
        } else {
            total += d;
        }
    }
    (total > 0).then_some(total as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<Section> {
        let doc = Document::from_text(text);
        extract_sections(&doc, &ExtractConfig::default(), &TitleCleaner::default())
    }

    #[test]
    fn amount_on_header_line() {
        let sections = run("A) SITE WORKS 250,000.00\nB) CONCRETE WORKS 480,000.00");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id, "A");
        assert_eq!(sections[0].amount, 250_000.0);
        assert_eq!(sections[0].title, "SITE WORKS");
    }

    #[test]
    fn keyword_total_within_window() {
        let sections = run("A) Site Mobilization\nscope as per plans\nTotal Amount 250,000.00");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "A");
        assert_eq!(sections[0].amount, 250_000.0);
    }

    #[test]
    fn pure_numeric_line_within_window() {
        let sections = run("B) ELECTRICAL WORKS\n\n125,000.00");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].amount, 125_000.0);
    }

    #[test]
    fn same_letter_sub_item_carries_amount() {
        let sections = run("C) FINISHES\nC.1 Floor tiles 80,000.00");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].amount, 80_000.0);
    }

    #[test]
    fn scan_stops_at_next_header() {
        // A's window must not steal B's subtotal.
        let sections = run("A) SITE WORKS\nB) CONCRETE WORKS\n99,000.00");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "B");
    }

    #[test]
    fn dedup_keeps_larger_amount() {
        let sections = run("A) SITE WORKS 5,000.00\nfiller\nA) SITE WORKS 250,000.00");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].amount, 250_000.0);
    }

    #[test]
    fn sub_items_are_not_headers() {
        assert!(run("A.1 Clearing and grubbing 4,000.00").is_empty());
    }

    #[test]
    fn headers_without_amounts_are_dropped() {
        assert!(run("A) SITE WORKS\nno numbers anywhere").is_empty());
    }

    #[test]
    fn noise_filter_drops_tiny_sections() {
        let text = "A) ONE 10,000.00\nB) TWO 20,000.00\nC) THREE 30,000.00\n\
                    D) FOUR 40,000.00\nE) FIVE 50,000.00\nF) SIX 60,000.00\n\
                    G) STRAY 50.00";
        let sections = run(text);
        assert_eq!(sections.len(), 6);
        assert!(sections.iter().all(|s| s.id != "G"));
    }

    #[test]
    fn noise_filter_inactive_below_strong_count() {
        let text = "A) ONE 10,000.00\nB) TWO 20,000.00\nC) STRAY 50.00";
        let sections = run(text);
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn natural_ordering_numeric_roman_alpha() {
        let mut ids = vec!["B", "A", "10", "2", "IV", "II"];
        ids.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
        assert_eq!(ids, vec!["2", "10", "II", "IV", "A", "B"]);
    }

    #[test]
    fn single_letters_sort_alphabetically_not_as_roman() {
        let mut ids = vec!["D", "C", "A", "B"];
        ids.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn roman_decoding() {
        assert_eq!(roman_value("II"), Some(2));
        assert_eq!(roman_value("IV"), Some(4));
        assert_eq!(roman_value("IX"), Some(9));
        assert_eq!(roman_value("XIV"), Some(14));
        assert_eq!(roman_value("MCMXC"), Some(1990));
        assert_eq!(roman_value("AB"), None);
    }
}
