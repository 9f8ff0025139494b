//! Extraction entry points and the strategy orchestrator.
//!
//! The [`Extractor`] owns the two injected collaborators — the pdfium
//! decoder and the title cleaner — and applies the selection policy over
//! the strategy chain:
//!
//! ```text
//! item_block  ──▶ any items?  ──▶ authoritative, done
//! row_scan    ──▶ items?      ──▶ keep
//! positional  ──▶ runs only when row_scan found < fallback_min_items;
//!                 the larger of the two result sets wins
//! ```
//!
//! The positional tier is the only step that needs a second decode pass,
//! so it is deferred until the text tier has proven insufficient — most
//! documents never pay for it.

use crate::config::{ExtractConfig, ThresholdSnapshot};
use crate::error::ExtractError;
use crate::output::{BudgetBreakdown, DocumentMetadata, ExtractStats, ExtractionMode};
use crate::pipeline::decode::{memory_origin, PdfDecoder};
use crate::pipeline::document::Document;
use crate::pipeline::strategy::{
    blocks::ItemBlocks, clusters::PositionalClustering, rows::RowScan, run_text_chain,
    sections, Candidate, SelectionPolicy, Strategy,
};
use crate::pipeline::{dedup, input};
use crate::pipeline::titles::TitleCleaner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The extraction pipeline with its injected collaborators.
///
/// Construction is cheap; the pdfium engine binds lazily on the first
/// decode and is then reused for the extractor's lifetime. Callers doing
/// repeated extractions should hold one `Extractor` rather than using the
/// free functions, which build a fresh one per call.
pub struct Extractor {
    decoder: Arc<PdfDecoder>,
    cleaner: TitleCleaner,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            decoder: Arc::new(PdfDecoder::new()),
            cleaner: TitleCleaner::default(),
        }
    }

    /// Use a shared decoder (e.g. one engine across several extractors).
    pub fn with_decoder(decoder: Arc<PdfDecoder>) -> Self {
        Self {
            decoder,
            cleaner: TitleCleaner::default(),
        }
    }

    /// Replace the title-correction data wholesale.
    pub fn with_cleaner(mut self, cleaner: TitleCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Extract a budget breakdown from a local file path or HTTP(S) URL.
    ///
    /// # Errors
    /// Fatal input problems only (missing file, bad download, corrupt
    /// PDF). An unrecognisable but readable document returns an empty
    /// breakdown, not an error.
    pub async fn extract(
        &self,
        input_str: impl AsRef<str>,
        cfg: &ExtractConfig,
    ) -> Result<BudgetBreakdown, ExtractError> {
        let input_str = input_str.as_ref();
        info!("starting extraction: {input_str}");

        let resolved = input::resolve_input(input_str, cfg.download_timeout_secs).await?;
        let path = resolved.path().to_path_buf();
        let bytes = read_file(&path).await?;
        self.extract_bytes_inner(Arc::new(bytes), path, cfg).await
    }

    /// Extract from an in-memory PDF buffer.
    ///
    /// An empty buffer yields an empty breakdown — a blank upload is an
    /// expected input, not an error.
    pub async fn extract_from_bytes(
        &self,
        bytes: Vec<u8>,
        cfg: &ExtractConfig,
    ) -> Result<BudgetBreakdown, ExtractError> {
        if bytes.is_empty() {
            return Ok(BudgetBreakdown::empty());
        }
        self.extract_bytes_inner(Arc::new(bytes), memory_origin(), cfg)
            .await
    }

    /// Run the text-tier pipeline over already-decoded text. No positional
    /// fallback is possible here — there are no fragments to cluster.
    pub fn extract_from_text(&self, text: &str, cfg: &ExtractConfig) -> BudgetBreakdown {
        self.extract_from_document(Document::from_text(text), cfg)
    }

    /// Run the full pipeline over a pre-built [`Document`]. The positional
    /// fallback participates when the document carries page fragments —
    /// the entry point for callers with their own decoding collaborator.
    pub fn extract_from_document(&self, doc: Document, cfg: &ExtractConfig) -> BudgetBreakdown {
        if doc.is_empty() && doc.pages.is_none() {
            return BudgetBreakdown::empty();
        }

        let outcome = self.run_text_tier(&doc, cfg);
        let outcome = self.maybe_run_positional(&doc, outcome, cfg);
        self.finish(&doc, outcome, cfg)
    }

    /// Decode document metadata without extracting anything.
    pub async fn inspect(&self, input_str: impl AsRef<str>) -> Result<DocumentMetadata, ExtractError> {
        let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
        let path = resolved.path().to_path_buf();
        let bytes = Arc::new(read_file(&path).await?);

        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.metadata(&bytes, None, &path))
            .await
            .map_err(|e| ExtractError::Internal(format!("metadata task panicked: {e}")))?
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn extract_bytes_inner(
        &self,
        bytes: Arc<Vec<u8>>,
        origin: PathBuf,
        cfg: &ExtractConfig,
    ) -> Result<BudgetBreakdown, ExtractError> {
        debug!(thresholds = ?ThresholdSnapshot::from(cfg), "run configuration");
        if let Some(cb) = &cfg.progress_callback {
            cb.on_decode_start();
        }

        // ── Text decode: one blocking call for the whole document ────────
        let decode_start = Instant::now();
        let text = {
            let decoder = Arc::clone(&self.decoder);
            let bytes = Arc::clone(&bytes);
            let origin = origin.clone();
            let password = cfg.password.clone();
            tokio::task::spawn_blocking(move || {
                decoder.decode_text(&bytes, password.as_deref(), &origin)
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("decode task panicked: {e}")))??
        };
        debug!(ms = decode_start.elapsed().as_millis() as u64, "text decode done");

        let doc = Document::from_text(&text);
        if doc.is_empty() {
            info!("document has no text content");
            return Ok(BudgetBreakdown::empty());
        }

        // ── Text tier ────────────────────────────────────────────────────
        let outcome = self.run_text_tier(&doc, cfg);

        // ── Positional tier, only when the text tier came up short ───────
        let mut doc = doc;
        if self.wants_positional(&outcome, cfg) {
            match self.decode_fragments(&bytes, &origin, cfg).await {
                Ok(pages) => doc = doc.with_pages(pages),
                // A corrupt positional layer must not cost us the text
                // results; the strategy just sits this document out.
                Err(e) => warn!("positional decode failed, keeping text results: {e}"),
            }
        }
        let outcome = self.maybe_run_positional(&doc, outcome, cfg);

        Ok(self.finish(&doc, outcome, cfg))
    }

    async fn decode_fragments(
        &self,
        bytes: &Arc<Vec<u8>>,
        origin: &Path,
        cfg: &ExtractConfig,
    ) -> Result<Vec<crate::pipeline::document::PageFragments>, ExtractError> {
        let decoder = Arc::clone(&self.decoder);
        let bytes = Arc::clone(bytes);
        let origin = origin.to_path_buf();
        let password = cfg.password.clone();
        let page_cap = cfg.positional_page_cap;
        let progress = cfg.progress_callback.clone();

        tokio::task::spawn_blocking(move || {
            decoder.decode_fragments(&bytes, password.as_deref(), &origin, page_cap, progress.as_ref())
        })
        .await
        .map_err(|e| ExtractError::Internal(format!("fragment task panicked: {e}")))?
    }

    /// Sections plus the authoritative/fallback text strategies.
    fn run_text_tier(&self, doc: &Document, cfg: &ExtractConfig) -> TierOutcome {
        let sections = sections::extract_sections(doc, cfg, &self.cleaner);
        debug!(sections = sections.len(), "section headers resolved");

        let item_blocks = ItemBlocks;
        let row_scan = RowScan;
        let chain: [(&dyn Strategy, SelectionPolicy); 2] = [
            (&item_blocks, SelectionPolicy::Authoritative),
            (&row_scan, SelectionPolicy::FirstNonEmpty),
        ];

        let winner = run_text_chain(&chain, doc, cfg, |name, count| {
            debug!(strategy = name, candidates = count, "strategy complete");
            if let Some(cb) = &cfg.progress_callback {
                cb.on_strategy_complete(name, count);
            }
        });

        TierOutcome {
            sections,
            winner,
            pages_clustered: 0,
        }
    }

    fn wants_positional(&self, outcome: &TierOutcome, cfg: &ExtractConfig) -> bool {
        if cfg.text_only {
            return false;
        }
        match &outcome.winner {
            Some(("item_block", _)) => false,
            Some((_, found)) => found.len() < cfg.fallback_min_items,
            None => true,
        }
    }

    /// Run the positional backstop when warranted, keeping whichever
    /// fallback produced more items.
    fn maybe_run_positional(
        &self,
        doc: &Document,
        mut outcome: TierOutcome,
        cfg: &ExtractConfig,
    ) -> TierOutcome {
        if !self.wants_positional(&outcome, cfg) || doc.pages.is_none() {
            return outcome;
        }

        let positional = PositionalClustering;
        let found = positional.extract(doc, cfg);
        debug!(candidates = found.len(), "positional clustering complete");
        if let Some(cb) = &cfg.progress_callback {
            cb.on_strategy_complete(positional.name(), found.len());
        }

        outcome.pages_clustered = doc
            .pages
            .as_ref()
            .map(|pages| pages.len().min(cfg.positional_page_cap))
            .unwrap_or(0);

        let current = outcome.winner.as_ref().map(|(_, f)| f.len()).unwrap_or(0);
        if found.len() > current {
            outcome.winner = Some((positional.name(), found));
        }
        outcome
    }

    fn finish(&self, doc: &Document, outcome: TierOutcome, cfg: &ExtractConfig) -> BudgetBreakdown {
        let (strategy, candidates) = outcome.winner.unwrap_or(("empty", Vec::new()));
        let raw_count = candidates.len();

        let deduped = dedup::dedup_largest(candidates);
        let items = dedup::number_items(deduped, strategy, &self.cleaner);

        let stats = ExtractStats {
            lines_scanned: doc.lines.len(),
            pages_clustered: outcome.pages_clustered,
            candidates: raw_count,
        };

        let mode = match strategy {
            "item_block" => ExtractionMode::ItemBlock,
            "row_scan" => ExtractionMode::RowScan,
            "positional" => ExtractionMode::Positional,
            _ => ExtractionMode::Empty,
        };

        let breakdown = BudgetBreakdown::assemble(mode, outcome.sections, items, stats);
        info!(
            mode = %breakdown.mode,
            items = breakdown.items.len(),
            sections = breakdown.sections.len(),
            total = breakdown.total_all,
            "extraction complete"
        );
        if let Some(cb) = &cfg.progress_callback {
            cb.on_complete(breakdown.items.len(), breakdown.sections.len());
        }
        breakdown
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// What the tiers have agreed on so far.
struct TierOutcome {
    sections: Vec<crate::output::Section>,
    winner: Option<(&'static str, Vec<Candidate>)>,
    pages_clustered: usize,
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::Internal(format!("read {}: {e}", path.display())),
    })
}

// ── Free-function API (builds a fresh Extractor per call) ────────────────

/// Extract a budget breakdown from a file path or URL.
///
/// Convenience wrapper; repeated callers should hold an [`Extractor`] so
/// the pdfium engine binds once.
pub async fn extract(
    input_str: impl AsRef<str>,
    cfg: &ExtractConfig,
) -> Result<BudgetBreakdown, ExtractError> {
    Extractor::new().extract(input_str, cfg).await
}

/// Extract from an in-memory PDF buffer.
pub async fn extract_from_bytes(
    bytes: Vec<u8>,
    cfg: &ExtractConfig,
) -> Result<BudgetBreakdown, ExtractError> {
    Extractor::new().extract_from_bytes(bytes, cfg).await
}

/// Synchronous wrapper around [`extract`]. Creates a temporary tokio
/// runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    cfg: &ExtractConfig,
) -> Result<BudgetBreakdown, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(extract(input_str, cfg))
}

/// Decode document metadata without extracting content.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, ExtractError> {
    Extractor::new().inspect(input_str).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::{Fragment, PageFragments};

    fn frag(text: &str, x: f32, y: f32) -> Fragment {
        Fragment {
            text: text.to_string(),
            x,
            y,
        }
    }

    fn page(rows: &[(&str, f64)]) -> PageFragments {
        let mut fragments = Vec::new();
        for (i, (title, amount)) in rows.iter().enumerate() {
            let y = 700.0 - (i as f32) * 20.0;
            fragments.push(frag(title, 50.0, y));
            fragments.push(frag(&format!("{amount:.2}"), 400.0, y));
        }
        PageFragments { page: 0, fragments }
    }

    #[test]
    fn item_block_is_authoritative() {
        let ex = Extractor::new();
        let out = ex.extract_from_text(
            "03 50 00 CONCRETE REINFORCEMENT\n\n125,000.00\n\
             Loose row item 99,000.00",
            &ExtractConfig::default(),
        );
        assert_eq!(out.mode, ExtractionMode::ItemBlock);
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].amount, 125_000.0);
    }

    #[test]
    fn row_scan_runs_when_blocks_find_nothing() {
        let ex = Extractor::new();
        let out = ex.extract_from_text(
            "Portland Cement Type 1 45,000.00\nRebar supply 125,000.00",
            &ExtractConfig::default(),
        );
        assert_eq!(out.mode, ExtractionMode::RowScan);
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.total_all, 170_000.0);
    }

    #[test]
    fn positional_backstop_wins_when_larger() {
        let ex = Extractor::new();
        // Two text rows (< fallback_min_items), three positional rows.
        let doc = Document::from_text("Cement 45,000.00\nRebar 125,000.00").with_pages(vec![
            page(&[
                ("Cement supply", 45_000.0),
                ("Rebar supply", 125_000.0),
                ("Formwork supply", 60_000.0),
            ]),
        ]);
        let out = ex.extract_from_document(doc, &ExtractConfig::default());
        assert_eq!(out.mode, ExtractionMode::Positional);
        assert_eq!(out.items.len(), 3);
    }

    #[test]
    fn smaller_positional_result_is_discarded() {
        let ex = Extractor::new();
        let doc = Document::from_text("Cement bags 45,000.00\nRebar supply 125,000.00")
            .with_pages(vec![page(&[("Cement supply", 45_000.0)])]);
        let out = ex.extract_from_document(doc, &ExtractConfig::default());
        assert_eq!(out.mode, ExtractionMode::RowScan);
        assert_eq!(out.items.len(), 2);
    }

    #[test]
    fn text_only_skips_positional() {
        let ex = Extractor::new();
        let cfg = ExtractConfig::builder().text_only(true).build().unwrap();
        let doc = Document::from_text("Cement bags 45,000.00")
            .with_pages(vec![page(&[("A", 1000.0), ("B", 2000.0), ("C", 3000.0)])]);
        let out = ex.extract_from_document(doc, &cfg);
        assert_eq!(out.mode, ExtractionMode::RowScan);
    }

    #[test]
    fn sufficient_row_results_skip_positional() {
        let ex = Extractor::new();
        let text: String = (0..12)
            .map(|i| format!("Work item number {i} {},000.00\n", 10 + i))
            .collect();
        let doc = Document::from_text(&text).with_pages(vec![page(&[("Only one", 9_000.0)])]);
        let out = ex.extract_from_document(doc, &ExtractConfig::default());
        assert_eq!(out.mode, ExtractionMode::RowScan);
        assert_eq!(out.items.len(), 12);
        assert_eq!(out.stats.pages_clustered, 0);
    }

    #[test]
    fn empty_text_is_an_empty_breakdown() {
        let ex = Extractor::new();
        let out = ex.extract_from_text("", &ExtractConfig::default());
        assert_eq!(out.mode, ExtractionMode::Empty);
        assert!(out.items.is_empty());
        assert_eq!(out.total_all, 0.0);
    }

    #[test]
    fn rerun_is_bit_identical() {
        let ex = Extractor::new();
        let text = "A) SITE WORKS 250,000.00\n\
                    Portland Cement Type 1 45,000.00\n\
                    Rebar supply 125,000.00";
        let cfg = ExtractConfig::default();
        let a = ex.extract_from_text(text, &cfg);
        let b = ex.extract_from_text(text, &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn total_all_matches_item_sum() {
        let ex = Extractor::new();
        let out = ex.extract_from_text(
            "Cement bags 45,000.25\nRebar supply 125,000.50\nGravel fill 8,000.00",
            &ExtractConfig::default(),
        );
        let sum: f64 = out.items.iter().map(|i| i.amount).sum();
        assert_eq!(out.total_all, sum);
        assert_eq!(out.row_sum, sum);
    }

    #[tokio::test]
    async fn empty_buffer_is_not_an_error() {
        let out = Extractor::new()
            .extract_from_bytes(Vec::new(), &ExtractConfig::default())
            .await
            .unwrap();
        assert_eq!(out.mode, ExtractionMode::Empty);
        assert_eq!(out.total_all, 0.0);
    }
}
