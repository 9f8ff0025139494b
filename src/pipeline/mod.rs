//! Pipeline stages for budget extraction.
//!
//! Each submodule implements exactly one concern. Keeping stages separate
//! makes each independently testable and lets us swap implementations
//! (e.g. a different decoding backend) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ document ──▶ strategy chain ──▶ dedup ──▶ output
//! (path/URL) (pdfium)  (lines/     (sections, blocks,  (larger
//!                       fragments)  rows, clusters)     amount wins)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local
//!    file
//! 2. [`decode`]   — pdfium text/fragment/metadata decode; blocking, run
//!    inside `spawn_blocking`
//! 3. [`document`] — normalised lines plus optional positioned fragments
//! 4. [`scan`]     — money-token detection and numeric normalisation
//! 5. [`strategy`] — the recognition strategies and their selection chain
//! 6. [`titles`]   — broken-word repair with a replaceable correction table
//! 7. [`dedup`]    — collapse duplicate detections, number the survivors

pub mod decode;
pub mod dedup;
pub mod document;
pub mod input;
pub mod scan;
pub mod strategy;
pub mod titles;
