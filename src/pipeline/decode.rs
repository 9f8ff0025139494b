//! PDF decoding: plain text, positioned fragments, and metadata via pdfium.
//!
//! ## Why a cached engine handle?
//!
//! Binding to the pdfium shared library costs a dlopen plus symbol
//! resolution. The handle is created lazily on first use and cached on the
//! decoder instance (`OnceCell`), so a long-lived [`PdfDecoder`] pays the
//! binding cost once — without any module-level mutable global. The
//! orchestrator receives the decoder as an explicit dependency at
//! construction.
//!
//! ## Why blocking functions?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not
//! safe to call from async contexts. All functions here are synchronous
//! and CPU-bound; the orchestrator runs them inside
//! `tokio::task::spawn_blocking`. Page-by-page fragment decoding is
//! likewise sequential — the engine is not reentrant, so page N completes
//! before page N+1 starts.

use crate::error::ExtractError;
use crate::output::DocumentMetadata;
use crate::pipeline::document::{Fragment, PageFragments};
use crate::progress::ProgressCallback;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lazily-bound pdfium engine plus the decode operations the pipeline
/// needs. Cheap to construct; the expensive binding happens on first use.
pub struct PdfDecoder {
    engine: OnceCell<Pdfium>,
}

impl PdfDecoder {
    pub fn new() -> Self {
        Self {
            engine: OnceCell::new(),
        }
    }

    /// Bind (once) and return the engine handle.
    ///
    /// Resolution order: `PDFIUM_LIB_PATH`, a library next to the binary,
    /// then the system library.
    fn engine(&self) -> Result<&Pdfium, ExtractError> {
        self.engine.get_or_try_init(|| {
            let bindings = match std::env::var("PDFIUM_LIB_PATH") {
                Ok(path) => Pdfium::bind_to_library(path),
                Err(_) => Pdfium::bind_to_library(
                    Pdfium::pdfium_platform_library_name_at_path("./"),
                )
                .or_else(|_| Pdfium::bind_to_system_library()),
            }
            .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;
            info!("pdfium engine bound");
            Ok(Pdfium::new(bindings))
        })
    }

    fn load<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&str>,
        origin: &Path,
    ) -> Result<PdfDocument<'a>, ExtractError> {
        self.engine()?
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| map_load_error(e, password, origin))
    }

    /// Decode the whole document's flattened text, pages in order,
    /// separated by newlines.
    pub fn decode_text(
        &self,
        bytes: &[u8],
        password: Option<&str>,
        origin: &Path,
    ) -> Result<String, ExtractError> {
        let document = self.load(bytes, password, origin)?;
        let pages = document.pages();
        let mut out = String::new();

        for page in pages.iter() {
            let text = page
                .text()
                .map_err(|e| ExtractError::TextDecodeFailed {
                    detail: format!("{e:?}"),
                })?
                .all();
            out.push_str(&text);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        debug!(pages = pages.len(), bytes = out.len(), "text decoded");
        Ok(out)
    }

    /// Decode positioned text fragments for the first `page_cap` pages.
    ///
    /// Fragment coordinates are the segment's left edge and bottom edge in
    /// PDF points. Pages are decoded strictly in order; `progress` (when
    /// present) hears about each completed page.
    pub fn decode_fragments(
        &self,
        bytes: &[u8],
        password: Option<&str>,
        origin: &Path,
        page_cap: usize,
        progress: Option<&ProgressCallback>,
    ) -> Result<Vec<PageFragments>, ExtractError> {
        let document = self.load(bytes, password, origin)?;
        let pages = document.pages();
        let total = (pages.len() as usize).min(page_cap);
        let mut out = Vec::with_capacity(total);

        for (page_index, page) in pages.iter().take(page_cap).enumerate() {
            let text = page.text().map_err(|e| ExtractError::TextDecodeFailed {
                detail: format!("page {}: {e:?}", page_index + 1),
            })?;

            let mut fragments = Vec::new();
            for segment in text.segments().iter() {
                let bounds = segment.bounds();
                fragments.push(Fragment {
                    text: segment.text(),
                    x: bounds.left().value,
                    y: bounds.bottom().value,
                });
            }

            debug!(page = page_index, fragments = fragments.len(), "page fragments decoded");
            out.push(PageFragments {
                page: page_index,
                fragments,
            });
            if let Some(cb) = progress {
                cb.on_page_decoded(page_index + 1, total);
            }
        }

        Ok(out)
    }

    /// Decode document metadata without touching page content.
    pub fn metadata(
        &self,
        bytes: &[u8],
        password: Option<&str>,
        origin: &Path,
    ) -> Result<DocumentMetadata, ExtractError> {
        let document = self.load(bytes, password, origin)?;
        let metadata = document.metadata();
        let pages = document.pages();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: pages.len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }
}

impl Default for PdfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn map_load_error(e: PdfiumError, password: Option<&str>, origin: &Path) -> ExtractError {
    let err_str = format!("{e:?}");
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ExtractError::WrongPassword {
                path: origin.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: origin.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: origin.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Placeholder path used for in-memory buffers in error messages.
pub fn memory_origin() -> PathBuf {
    PathBuf::from("<memory>")
}
