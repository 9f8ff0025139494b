//! Configuration types for budget extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractConfig`], built via
//! its [`ExtractConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across threads, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! Most fields are heuristic thresholds calibrated against real flattened
//! budget documents. None of them have a first-principles justification —
//! they are named and overridable precisely so that a caller with a corpus
//! of their own documents can re-tune them without forking the crate.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for one extraction run.
///
/// Built via [`ExtractConfig::builder()`] or using
/// [`ExtractConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2boq::ExtractConfig;
///
/// let config = ExtractConfig::builder()
///     .positional_page_cap(15)
///     .fallback_min_items(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Forward-scan window when a section header carries no amount on its own
    /// line. Default: 30.
    ///
    /// Section subtotals frequently land many lines below their header once a
    /// two-column layout is flattened. 30 lines covers every layout observed
    /// in practice while keeping the scan O(1) per header; the scan also stops
    /// early at the next header, so the window only matters for the last
    /// section of a page.
    pub section_lookahead: usize,

    /// Forward-scan window (non-blank lines) for the item-block strategy's
    /// amount search. Default: 40.
    ///
    /// A description block and its amount can be separated by the entire
    /// remainder of a flattened column. 40 lines is generous enough for real
    /// documents; anything further apart is more likely two unrelated rows
    /// than one item.
    pub block_lookahead: usize,

    /// Hard cap on the total line span (blank lines included) one item block
    /// may cover. Default: 60.
    ///
    /// Guards the worst case where a sparse page is almost entirely blank
    /// lines: without it, `block_lookahead` non-blank lines could span
    /// hundreds of raw lines and the scan would degenerate to O(n²).
    pub block_span_limit: usize,

    /// Minimum value for a plain (ungrouped) standalone number to be accepted
    /// as an item amount. Default: 500.0.
    ///
    /// Quantities, item numbers, and CSI code fragments are all small plain
    /// numbers; real budget amounts below 500 are rare. Comma-grouped numbers
    /// bypass this check — the grouping itself marks them as money.
    pub min_standalone_amount: f64,

    /// Minimum value for a trailing token to be read as a row total by the
    /// loose last-token sub-strategy. Default: 1000.0.
    ///
    /// This sub-strategy deliberately ignores earlier numeric tokens on the
    /// line (qty × rate columns), so its only defence against reading a rate
    /// as a total is this floor.
    pub min_loose_total: f64,

    /// Minimum value for a row amount in the positional-clustering fallback.
    /// Default: 300.0.
    ///
    /// Synthetic rows rebuilt from positioned fragments are noisier than
    /// sequential text, so the floor is lower than `min_standalone_amount`:
    /// by the time this strategy runs, recall matters more than precision.
    pub min_positional_amount: f64,

    /// Number of leading pages the positional fallback decodes. Default: 12.
    ///
    /// Budget summary tables live in the first few pages; the hundreds of
    /// detail pages that can follow add cost without adding items. The cap
    /// bounds the only per-page-cost step of the pipeline.
    pub positional_page_cap: usize,

    /// Row-scanning result sizes below this trigger the positional fallback.
    /// Default: 10.
    ///
    /// A budget with fewer than ~10 recognised rows usually means the text
    /// flattening destroyed the row structure, which is exactly the failure
    /// mode positional clustering repairs.
    pub fallback_min_items: usize,

    /// Vertical bucket size, in PDF points, when clustering positioned
    /// fragments into rows. Default: 2.0.
    ///
    /// Fragments of one visual row can differ by a point or two of rendering
    /// jitter. Two points merges those without merging adjacent rows, whose
    /// spacing is normally ≥ 8 points.
    pub row_y_tolerance: f32,

    /// Noise filter: number of sections with amount ≥
    /// `strong_section_amount` required before the filter activates.
    /// Default: 5.
    ///
    /// The threshold has no derivation beyond field calibration; it is kept
    /// as a named constant rather than silently inlined so it can be re-tuned
    /// against a better corpus.
    pub strong_section_count: usize,

    /// Noise filter: amount at which a section counts as "strong".
    /// Default: 10_000.0.
    pub strong_section_amount: f64,

    /// Noise filter: sections below this amount are dropped once the filter
    /// activates. Default: 1_000.0.
    ///
    /// Rationale: when five-plus sections carry five-figure subtotals, a
    /// section worth less than a thousand is almost always a stray page
    /// number or quantity that happened to follow a letter.
    pub weak_section_cutoff: f64,

    /// Skip the positional-clustering fallback entirely. Default: false.
    ///
    /// Useful when the caller knows the document's text layer is reliable,
    /// or wants strictly text-deterministic output.
    pub text_only: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Progress callback receiving decode and strategy events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            section_lookahead: 30,
            block_lookahead: 40,
            block_span_limit: 60,
            min_standalone_amount: 500.0,
            min_loose_total: 1000.0,
            min_positional_amount: 300.0,
            positional_page_cap: 12,
            fallback_min_items: 10,
            row_y_tolerance: 2.0,
            strong_section_count: 5,
            strong_section_amount: 10_000.0,
            weak_section_cutoff: 1_000.0,
            text_only: false,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("section_lookahead", &self.section_lookahead)
            .field("block_lookahead", &self.block_lookahead)
            .field("block_span_limit", &self.block_span_limit)
            .field("min_standalone_amount", &self.min_standalone_amount)
            .field("min_loose_total", &self.min_loose_total)
            .field("min_positional_amount", &self.min_positional_amount)
            .field("positional_page_cap", &self.positional_page_cap)
            .field("fallback_min_items", &self.fallback_min_items)
            .field("row_y_tolerance", &self.row_y_tolerance)
            .field("strong_section_count", &self.strong_section_count)
            .field("strong_section_amount", &self.strong_section_amount)
            .field("weak_section_cutoff", &self.weak_section_cutoff)
            .field("text_only", &self.text_only)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn section_lookahead(mut self, lines: usize) -> Self {
        self.config.section_lookahead = lines.max(1);
        self
    }

    pub fn block_lookahead(mut self, lines: usize) -> Self {
        self.config.block_lookahead = lines.max(1);
        self
    }

    pub fn block_span_limit(mut self, lines: usize) -> Self {
        self.config.block_span_limit = lines.max(1);
        self
    }

    pub fn min_standalone_amount(mut self, amount: f64) -> Self {
        self.config.min_standalone_amount = amount;
        self
    }

    pub fn min_loose_total(mut self, amount: f64) -> Self {
        self.config.min_loose_total = amount;
        self
    }

    pub fn min_positional_amount(mut self, amount: f64) -> Self {
        self.config.min_positional_amount = amount;
        self
    }

    pub fn positional_page_cap(mut self, pages: usize) -> Self {
        self.config.positional_page_cap = pages.max(1);
        self
    }

    pub fn fallback_min_items(mut self, items: usize) -> Self {
        self.config.fallback_min_items = items;
        self
    }

    pub fn row_y_tolerance(mut self, points: f32) -> Self {
        self.config.row_y_tolerance = points.max(0.1);
        self
    }

    pub fn strong_section_count(mut self, count: usize) -> Self {
        self.config.strong_section_count = count;
        self
    }

    pub fn strong_section_amount(mut self, amount: f64) -> Self {
        self.config.strong_section_amount = amount;
        self
    }

    pub fn weak_section_cutoff(mut self, amount: f64) -> Self {
        self.config.weak_section_cutoff = amount;
        self
    }

    pub fn text_only(mut self, v: bool) -> Self {
        self.config.text_only = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating cross-field constraints.
    pub fn build(self) -> Result<ExtractConfig, ExtractError> {
        let c = &self.config;
        if c.block_span_limit < c.block_lookahead {
            return Err(ExtractError::InvalidConfig(format!(
                "block_span_limit ({}) must be ≥ block_lookahead ({})",
                c.block_span_limit, c.block_lookahead
            )));
        }
        if c.weak_section_cutoff > c.strong_section_amount {
            return Err(ExtractError::InvalidConfig(format!(
                "weak_section_cutoff ({}) must be ≤ strong_section_amount ({})",
                c.weak_section_cutoff, c.strong_section_amount
            )));
        }
        Ok(self.config)
    }
}

/// Serialisable snapshot of the heuristic thresholds, for run logging.
///
/// [`ExtractConfig`] itself holds a callback and cannot derive serde; this
/// mirror struct carries just the numbers so two runs can be diffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub section_lookahead: usize,
    pub block_lookahead: usize,
    pub block_span_limit: usize,
    pub min_standalone_amount: f64,
    pub min_loose_total: f64,
    pub min_positional_amount: f64,
    pub positional_page_cap: usize,
    pub fallback_min_items: usize,
    pub strong_section_count: usize,
    pub strong_section_amount: f64,
    pub weak_section_cutoff: f64,
}

impl From<&ExtractConfig> for ThresholdSnapshot {
    fn from(c: &ExtractConfig) -> Self {
        Self {
            section_lookahead: c.section_lookahead,
            block_lookahead: c.block_lookahead,
            block_span_limit: c.block_span_limit,
            min_standalone_amount: c.min_standalone_amount,
            min_loose_total: c.min_loose_total,
            min_positional_amount: c.min_positional_amount,
            positional_page_cap: c.positional_page_cap,
            fallback_min_items: c.fallback_min_items,
            strong_section_count: c.strong_section_count,
            strong_section_amount: c.strong_section_amount,
            weak_section_cutoff: c.weak_section_cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = ExtractConfig::builder().build().unwrap();
        assert_eq!(config.section_lookahead, 30);
        assert_eq!(config.block_lookahead, 40);
        assert_eq!(config.fallback_min_items, 10);
    }

    #[test]
    fn span_limit_below_lookahead_rejected() {
        let result = ExtractConfig::builder()
            .block_lookahead(50)
            .block_span_limit(40)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn cutoff_above_strong_amount_rejected() {
        let result = ExtractConfig::builder()
            .weak_section_cutoff(20_000.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn setters_clamp_to_minimums() {
        let config = ExtractConfig::builder()
            .positional_page_cap(0)
            .row_y_tolerance(0.0)
            .build()
            .unwrap();
        assert_eq!(config.positional_page_cap, 1);
        assert!(config.row_y_tolerance > 0.0);
    }

    #[test]
    fn snapshot_mirrors_config() {
        let config = ExtractConfig::builder()
            .fallback_min_items(7)
            .build()
            .unwrap();
        let snap = ThresholdSnapshot::from(&config);
        assert_eq!(snap.fallback_min_items, 7);
        assert_eq!(snap.strong_section_count, config.strong_section_count);
    }
}
