//! In-memory document model shared by all strategies.
//!
//! A [`Document`] is built once per extraction call from the decoder's
//! output and read by every strategy: whitespace-normalised text lines for
//! the line-based strategies, plus optional per-page positioned fragments
//! for the clustering fallback.

/// One line of flattened document text.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// 0-based index within the document.
    pub index: usize,
    /// Line as decoded, untrimmed.
    pub raw: String,
    /// Trimmed, with internal whitespace runs collapsed to single spaces.
    pub text: String,
}

impl TextLine {
    /// Whether the line is empty after normalisation.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// One positioned text fragment, as placed on the page by the decoder.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    /// Left edge, PDF points from the page's left margin.
    pub x: f32,
    /// Baseline height, PDF points from the page's bottom edge.
    pub y: f32,
}

/// All positioned fragments of a single page.
#[derive(Debug, Clone)]
pub struct PageFragments {
    /// 0-based page index.
    pub page: usize,
    pub fragments: Vec<Fragment>,
}

/// The full document handed to the strategy chain.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub lines: Vec<TextLine>,
    /// Present only when the binary document was supplied and positional
    /// decode succeeded.
    pub pages: Option<Vec<PageFragments>>,
}

impl Document {
    /// Split raw decoder text into normalised lines.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, raw)| TextLine {
                index,
                raw: raw.to_string(),
                text: normalize_whitespace(raw),
            })
            .collect();
        Self { lines, pages: None }
    }

    pub fn with_pages(mut self, pages: Vec<PageFragments>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(TextLine::is_blank)
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_indexes_and_normalizes() {
        let doc = Document::from_text("  Portland   Cement  \n\n03 50 00");
        assert_eq!(doc.lines.len(), 3);
        assert_eq!(doc.lines[0].text, "Portland Cement");
        assert_eq!(doc.lines[0].raw, "  Portland   Cement  ");
        assert!(doc.lines[1].is_blank());
        assert_eq!(doc.lines[2].index, 2);
    }

    #[test]
    fn blank_and_whitespace_only_documents_are_empty() {
        assert!(Document::from_text("").is_empty());
        assert!(Document::from_text("  \n\t\n   ").is_empty());
        assert!(!Document::from_text("x").is_empty());
    }

    #[test]
    fn normalize_collapses_tabs_and_runs() {
        assert_eq!(normalize_whitespace("a\t\tb   c "), "a b c");
    }
}
