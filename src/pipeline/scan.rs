//! Monetary token detection and numeric normalisation.
//!
//! Two shapes count as money-shaped, and only two:
//!
//! - grouped thousands: `\d{1,3}(,\d{3})+(\.\d+)?` — "125,000" / "12,345.67"
//! - plain two-decimal: `\d+\.\d\d` — "450.00"
//!
//! Budget tables mix large grouped totals with small unit prices, so both
//! shapes are needed; a single catch-all `\d+` would drag in quantities,
//! item numbers, and CSI code fragments. Callers decide whether to use the
//! last token on a line (trailing totals) or require exactly one (stricter
//! strategies).

use once_cell::sync::Lazy;
use regex::Regex;

/// One currency-like substring found in a line.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyToken {
    /// The matched substring, separators intact.
    pub text: String,
    /// Parsed numeric value.
    pub value: f64,
    /// Byte offset of the match within the line.
    pub start: usize,
}

impl MoneyToken {
    /// Whether the token carries a thousands separator. Grouped tokens are
    /// trusted as money even below the plain-number value floors.
    pub fn is_grouped(&self) -> bool {
        self.text.contains(',')
    }
}

// Grouped branch first: alternation is leftmost-first, so "12,345.67" binds
// to the grouped shape as a whole instead of "345.67" binding to the plain
// shape. The `\b` on the plain branch keeps "1.234" from half-matching.
static RE_MONEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+\.\d\d\b").unwrap());

static RE_FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

static RE_PURE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[\d,]+(?:\.\d+)?$").unwrap());

/// Parse a locale-formatted monetary token into a double.
///
/// Strips whitespace and thousands separators, then parses the first signed
/// decimal substring. Returns `None` — never zero — when the input carries
/// no number at all, so callers can distinguish "absent" from "zero".
pub fn parse_amount(s: &str) -> Option<f64> {
    let stripped: String = s.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    let m = RE_FIRST_NUMBER.find(&stripped)?;
    m.as_str().parse::<f64>().ok()
}

/// Find every money-shaped token in a line, left to right.
pub fn scan_money(line: &str) -> Vec<MoneyToken> {
    RE_MONEY
        .find_iter(line)
        .filter_map(|m| {
            let value = parse_amount(m.as_str())?;
            Some(MoneyToken {
                text: m.as_str().to_string(),
                value,
                start: m.start(),
            })
        })
        .collect()
}

/// The last money-shaped token on a line, if any.
pub fn last_money(line: &str) -> Option<MoneyToken> {
    scan_money(line).pop()
}

/// Whether a whole (normalised) line is nothing but one number —
/// digits, optional grouping commas, optional decimals.
pub fn is_pure_number(line: &str) -> bool {
    !line.is_empty() && RE_PURE_NUMERIC.is_match(line)
}

/// Whether a single token, in isolation, is money-shaped.
pub fn is_money_shaped(token: &str) -> bool {
    RE_MONEY
        .find(token)
        .map(|m| m.start() == 0 && m.end() == token.len())
        .unwrap_or(false)
}

/// Remove every money-shaped token from a line, collapsing the leftover
/// whitespace. Used to turn a row into its description.
pub fn strip_money(line: &str) -> String {
    let stripped = RE_MONEY.replace_all(line, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_amount ─────────────────────────────────────────────────────

    #[test]
    fn parses_grouped_thousands() {
        assert_eq!(parse_amount("12,345.67"), Some(12345.67));
        assert_eq!(parse_amount("1,000"), Some(1000.0));
        assert_eq!(parse_amount("250,000.00"), Some(250000.0));
    }

    #[test]
    fn parses_with_embedded_whitespace() {
        assert_eq!(parse_amount(" 45 ,000 .00 "), Some(45000.0));
    }

    #[test]
    fn parses_signed_values() {
        assert_eq!(parse_amount("-1,500.25"), Some(-1500.25));
    }

    #[test]
    fn extracts_first_number_from_mixed_text() {
        assert_eq!(parse_amount("PHP 4,500.00 only"), Some(4500.0));
    }

    #[test]
    fn returns_none_not_zero_for_digit_free_input() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("no digits here"), None);
        assert_eq!(parse_amount("---"), None);
    }

    // ── scan_money ───────────────────────────────────────────────────────

    #[test]
    fn finds_both_shapes_left_to_right() {
        let tokens = scan_money("2 pcs 450.00 total 125,000.00");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["450.00", "125,000.00"]);
        assert_eq!(tokens[1].value, 125000.0);
        assert!(tokens[1].is_grouped());
        assert!(!tokens[0].is_grouped());
    }

    #[test]
    fn grouped_shape_wins_over_plain_suffix() {
        let tokens = scan_money("12,345.67");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "12,345.67");
        assert_eq!(tokens[0].start, 0);
    }

    #[test]
    fn bare_integers_are_not_money() {
        assert!(scan_money("03 50 00").is_empty());
        assert!(scan_money("item 12 of 30").is_empty());
    }

    #[test]
    fn three_decimal_numbers_are_not_money() {
        // Neither grouped nor exactly two decimals.
        assert!(scan_money("3.141").is_empty());
    }

    #[test]
    fn last_money_picks_trailing_total() {
        let t = last_money("Gravel 10 cu.m 800.00 8,000.00").unwrap();
        assert_eq!(t.value, 8000.0);
    }

    // ── shape predicates ─────────────────────────────────────────────────

    #[test]
    fn pure_number_lines() {
        assert!(is_pure_number("125,000.00"));
        assert!(is_pure_number("500"));
        assert!(!is_pure_number("subtotal 500"));
        assert!(!is_pure_number(""));
    }

    #[test]
    fn money_shaped_requires_full_match() {
        assert!(is_money_shaped("45,000.00"));
        assert!(is_money_shaped("450.00"));
        assert!(!is_money_shaped("45,000.00)"));
        assert!(!is_money_shaped("450"));
    }

    #[test]
    fn strip_money_leaves_description() {
        assert_eq!(
            strip_money("Portland Cement Type 1 45,000.00"),
            "Portland Cement Type 1"
        );
        assert_eq!(strip_money("Gravel 800.00 8,000.00"), "Gravel");
        assert_eq!(strip_money("no money here"), "no money here");
    }
}
