//! Progress-callback trait for decode and strategy events.
//!
//! Inject an [`Arc<dyn ExtractProgressCallback>`] via
//! [`crate::config::ExtractConfigBuilder::progress_callback`] to receive
//! events as the pipeline decodes the document and runs each strategy.
//!
//! Callbacks rather than channels: the caller can forward events to a
//! terminal spinner, a log record, or a websocket without the library
//! knowing anything about the host application. The trait is `Send + Sync`
//! because decode work runs on a blocking-pool thread.

use std::sync::Arc;

/// Called by the extraction pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractProgressCallback: Send + Sync {
    /// Called once before text decoding starts.
    fn on_decode_start(&self) {}

    /// Called after each page's positioned fragments are decoded
    /// (positional fallback only).
    ///
    /// # Arguments
    /// * `page_num` — 1-indexed page number
    /// * `total`    — pages the fallback will decode (after the cap)
    fn on_page_decoded(&self, page_num: usize, total: usize) {
        let _ = (page_num, total);
    }

    /// Called when a strategy finishes, with the number of raw candidates
    /// it produced (before deduplication).
    fn on_strategy_complete(&self, strategy: &str, candidates: usize) {
        let _ = (strategy, candidates);
    }

    /// Called once when the breakdown has been assembled.
    fn on_complete(&self, items: usize, sections: usize) {
        let _ = (items, sections);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractConfig`].
pub type ProgressCallback = Arc<dyn ExtractProgressCallback>;
