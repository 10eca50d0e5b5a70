//! Page rasterisation for the vision fallback.
//!
//! Scanned policies have no text layer, so the sampler returns nothing. In
//! that case the first few pages are rendered to images and sent to a
//! vision-capable model instead.
//!
//! The longest edge is capped by `max_rendered_pixels` rather than set by
//! DPI: page sizes vary too much for a fixed DPI to bound memory.

use crate::error::PolicyExtractError;
use crate::pipeline::pdf::{bind_pdfium, open_document};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Render the first `max_pages` pages of `pdf_path`.
///
/// Returns `(page_index_0based, image)` pairs. A page that fails to render
/// is logged and left out.
pub async fn render_leading_pages(
    pdf_path: &Path,
    password: Option<&str>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, PolicyExtractError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        render_leading_pages_blocking(&path, pwd.as_deref(), max_pages, max_pixels)
    })
    .await
    .map_err(|e| PolicyExtractError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_leading_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, PolicyExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(max_pages.min(total_pages));

    for idx in 0..max_pages.min(total_pages) {
        let page = match pages.get(idx as u16) {
            Ok(p) => p,
            Err(e) => {
                warn!("Page {}: could not load for rendering ({:?})", idx + 1, e);
                continue;
            }
        };

        match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let image = bitmap.as_image();
                debug!(
                    "Rendered page {} → {}x{} px",
                    idx + 1,
                    image.width(),
                    image.height()
                );
                results.push((idx, image));
            }
            Err(e) => warn!("Page {}: rasterisation failed ({:?})", idx + 1, e),
        };
    }

    Ok(results)
}
