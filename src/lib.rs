//! # pdf2boq
//!
//! Extract structured cost breakdowns from construction budget PDFs.
//!
//! ## Why this crate?
//!
//! Budget PDFs are tables, and tables do not survive text extraction:
//! columns interleave, cells merge, words split mid-syllable, and the same
//! number shows up twice. Generic PDF-to-text tools hand you that wreckage
//! as-is. This crate runs a layered chain of recognition heuristics over
//! the wreckage — each tolerant of a specific kind of damage — and
//! recovers coherent (description, amount) line items, section subtotals,
//! and a grand total.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Decode     flatten text via pdfium (blocking, spawn_blocking)
//!  ├─ 3. Sections   lettered/numbered headers and their subtotals
//!  ├─ 4. Items      item-block ▸ row-scan ▸ positional clustering
//!  ├─ 5. Repair     broken-word joins, correction table
//!  └─ 6. Output     deduplicated BudgetBreakdown + exact totals
//! ```
//!
//! The item tiers are strictly ordered: the strict block detector is
//! authoritative when it fires; the row heuristics cover documents that
//! kept amounts inline; positional clustering re-decodes the page as
//! positioned fragments and is reserved for documents the text tier
//! cannot crack.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2boq::{extract, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractConfig::default();
//!     let breakdown = extract("budget.pdf", &config).await?;
//!     println!("{} items, total {:.2}", breakdown.items.len(), breakdown.total_all);
//!     for item in &breakdown.items {
//!         println!("  {} — {:.2}", item.title, item.amount);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2boq` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! pdf2boq = { version = "0.3", default-features = false }
//! ```
//!
//! ## Accuracy expectations
//!
//! The heuristics are calibrated against real flattened budget documents
//! and will not be 100% accurate on arbitrary PDFs; every threshold they
//! use is a named, overridable field on [`ExtractConfig`], and the
//! title-repair data is a replaceable [`CorrectionTable`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractConfig, ExtractConfigBuilder, ThresholdSnapshot};
pub use error::ExtractError;
pub use extract::{extract, extract_from_bytes, extract_sync, inspect, Extractor};
pub use output::{
    BudgetBreakdown, DocumentMetadata, ExtractStats, ExtractionMode, LineItem, Section,
};
pub use pipeline::decode::PdfDecoder;
pub use pipeline::document::{Document, Fragment, PageFragments};
pub use pipeline::titles::{CorrectionTable, TitleCleaner};
pub use progress::{ExtractProgressCallback, NoopProgressCallback, ProgressCallback};
