//! Title repair: rejoin words broken by column flattening.
//!
//! Flattened budget PDFs routinely split a word across two text runs
//! ("ENVIRONME" / "NTAL") or glue a syllable to the wrong column. The
//! cleaner repairs these with three layers, applied in order:
//!
//! 1. an explicit correction table of full patterns observed in real
//!    documents;
//! 2. a small dictionary of known fragment pairs;
//! 3. a generic merge of adjacent all-caps tokens under narrow token-shape
//!    conditions.
//!
//! The correction table and dictionary are a heuristic patch for documents
//! we have actually seen, not a general solution — which is exactly why
//! they live in a [`CorrectionTable`] passed into the cleaner instead of
//! being inlined. Callers with their own corpus replace the table wholesale.
//!
//! The generic merge is deliberately conservative: a merge only fires when
//! both tokens are all-caps alphabetic, the shapes match a split (a very
//! short token against a long one), and neither side is a known whole word.
//! A correct title must come out of `clean` byte-identical.

use std::collections::HashSet;

/// Replaceable repair data for the title cleaner.
#[derive(Debug, Clone)]
pub struct CorrectionTable {
    /// Full-pattern substring replacements, applied first.
    pub replacements: Vec<(String, String)>,
    /// Known (left, right) fragment pairs that always merge.
    pub fragment_pairs: Vec<(String, String)>,
    /// Known whole words the generic merge must never consume.
    pub whole_words: HashSet<String>,
}

impl CorrectionTable {
    /// A table with no entries: only the generic token-shape merge runs.
    pub fn empty() -> Self {
        Self {
            replacements: Vec::new(),
            fragment_pairs: Vec::new(),
            whole_words: HashSet::new(),
        }
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        // Patterns where the right fragment collides with a real word
        // ("ON", "AL"), so the generic merge correctly refuses and an
        // explicit entry is the only safe repair.
        let replacements = [
            ("EXCAVATI ON", "EXCAVATION"),
            ("INSTALLATI ON", "INSTALLATION"),
            ("DEMOLITI ON", "DEMOLITION"),
            ("MOBILIZATI ON", "MOBILIZATION"),
            ("FOUNDATI ON", "FOUNDATION"),
            ("VENTILATI ON", "VENTILATION"),
            ("MECHANIC AL", "MECHANICAL"),
            ("ELECTRIC AL", "ELECTRICAL"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        // Splits whose halves are both too word-like for the generic rule.
        let fragment_pairs = [
            ("MASON", "RY"),
            ("CARPENT", "RY"),
            ("WATER", "PROOFING"),
            ("SCAFFOLD", "ING"),
            ("ENVIRONME", "NTAL"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        // Short tokens that legitimately stand alone in budget titles.
        let whole_words = [
            "AND", "OF", "FOR", "THE", "TO", "IN", "ON", "AT", "BY", "PER", "NO", "W", "CM",
            "LOT", "SET", "KG", "PCS", "SQM", "M", "M2", "M3", "CU", "EA", "LS", "QTY", "ITEM",
            "SUB", "SUM", "COST", "UNIT", "SITE", "WORKS", "TOTAL", "AMOUNT", "STEEL", "PIPE",
            "WALL", "SLAB", "BEAM", "TILE", "DOOR", "ROOF", "BASE", "PAINT",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            replacements,
            fragment_pairs,
            whole_words,
        }
    }
}

/// Repairs titles mangled by column flattening.
#[derive(Debug, Clone)]
pub struct TitleCleaner {
    table: CorrectionTable,
}

impl TitleCleaner {
    pub fn new(table: CorrectionTable) -> Self {
        Self { table }
    }

    /// Clean one title: whitespace normalisation, correction-table
    /// replacements, then broken-word joins.
    pub fn clean(&self, title: &str) -> String {
        let mut s: String = title.split_whitespace().collect::<Vec<_>>().join(" ");
        for (from, to) in &self.table.replacements {
            if s.contains(from.as_str()) {
                s = s.replace(from.as_str(), to);
            }
        }
        self.join_broken_words(&s)
    }

    fn join_broken_words(&self, s: &str) -> String {
        let tokens: Vec<&str> = s.split(' ').collect();
        let mut out: Vec<String> = Vec::with_capacity(tokens.len());

        for tok in tokens {
            if let Some(prev) = out.last_mut() {
                if self.should_merge(prev, tok) {
                    prev.push_str(tok);
                    continue;
                }
            }
            out.push(tok.to_string());
        }

        out.join(" ")
    }

    fn should_merge(&self, left: &str, right: &str) -> bool {
        if self
            .table
            .fragment_pairs
            .iter()
            .any(|(l, r)| l == left && r == right)
        {
            return true;
        }

        if !is_caps_word(left) || !is_caps_word(right) {
            return false;
        }
        let whole = |t: &str| self.table.whole_words.contains(t);

        // "E" + "XCAVATION": a stranded leading letter or two.
        if left.len() <= 2 && right.len() >= 5 && !whole(left) {
            return true;
        }
        // "ENVIRONME" + "NTAL": a long head with a short torn-off tail.
        if left.len() >= 6 && right.len() <= 4 && !whole(left) && !whole(right) {
            return true;
        }
        false
    }
}

impl Default for TitleCleaner {
    fn default() -> Self {
        Self::new(CorrectionTable::default())
    }
}

fn is_caps_word(t: &str) -> bool {
    !t.is_empty() && t.chars().all(|c| c.is_ascii_uppercase())
}
