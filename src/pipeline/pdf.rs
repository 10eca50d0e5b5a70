//! PDF decoding: bind pdfium, open a document and pull page text.
//!
//! Every function here is blocking. pdfium keeps thread-local state and is
//! not safe to drive from async worker threads, so the async wrappers move
//! the work onto `tokio::task::spawn_blocking`.
//!
//! Text is read per page as pdfium text segments, in reading order, and fed
//! to a [`PageSampler`]. Pages after the sampler says stop are never loaded.

use crate::config::ExtractionBudget;
use crate::error::PolicyExtractError;
use crate::pipeline::sampling::{PageSampler, SampledText, Step};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Result of decoding one document.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub sample: SampledText,
    /// Total pages in the document, independent of sampling.
    pub page_count: usize,
}

/// Bind to a pdfium library.
///
/// Lookup order: `PDFIUM_LIB_PATH` (a file or a directory), the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, PolicyExtractError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(&p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PolicyExtractError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Open `path`, mapping pdfium's load errors onto the fatal error enum.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PolicyExtractError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PolicyExtractError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                PolicyExtractError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            PolicyExtractError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Decode `path` and sample its early pages.
///
/// `max_pages` bounds how many pages are offered to the sampler; it never
/// rejects a longer document.
pub fn decode_blocking(
    path: &Path,
    password: Option<&str>,
    budget: ExtractionBudget,
    max_pages: Option<usize>,
) -> Result<DecodedDocument, PolicyExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, password)?;
    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let limit = max_pages.map_or(page_count, |m| m.min(page_count));
    let mut sampler = PageSampler::new(budget);

    for idx in 0..limit {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PolicyExtractError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let fragments: Vec<String> = match page.text() {
            Ok(text) => text.segments().iter().map(|s| s.text()).collect(),
            Err(e) => {
                warn!("Page {}: no text layer ({:?})", idx + 1, e);
                Vec::new()
            }
        };

        if sampler.push(fragments) == Step::Stop {
            break;
        }
    }

    let sample = sampler.finish();
    debug!(
        "Sampled {} chars from {} pages ({} skipped, truncated={})",
        sample.char_count(),
        sample.pages_scanned,
        sample.pages_skipped,
        sample.truncated
    );

    Ok(DecodedDocument { sample, page_count })
}

/// Count the pages of `path` without reading any text.
pub fn page_count_blocking(path: &Path, password: Option<&str>) -> Result<usize, PolicyExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, password)?;
    Ok(document.pages().len() as usize)
}

/// Async wrapper around [`decode_blocking`].
pub async fn decode(
    path: &Path,
    password: Option<&str>,
    budget: ExtractionBudget,
    max_pages: Option<usize>,
) -> Result<DecodedDocument, PolicyExtractError> {
    let path = path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || decode_blocking(&path, pwd.as_deref(), budget, max_pages))
        .await
        .map_err(|e| PolicyExtractError::Internal(format!("Decode task panicked: {}", e)))?
}

/// Async wrapper around [`page_count_blocking`].
pub async fn page_count(path: &Path, password: Option<&str>) -> Result<usize, PolicyExtractError> {
    let path = path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || page_count_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| PolicyExtractError::Internal(format!("Page-count task panicked: {}", e)))?
}
