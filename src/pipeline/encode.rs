//! Image encoding for the vision fallback: `DynamicImage` to a base64 PNG
//! wrapped in `ImageData`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// Encode a rendered policy page as a lossless PNG.
///
/// `detail: "high"` keeps small print such as policy and chassis numbers
/// legible to the model.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image: {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode every rendered page, dropping (and logging) pages that fail.
pub fn encode_pages(pages: &[(usize, DynamicImage)]) -> Vec<(usize, ImageData)> {
    pages
        .iter()
        .filter_map(|(idx, img)| match encode_page(img) {
            Ok(data) => Some((*idx, data)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", idx + 1, e);
                None
            }
        })
        .collect()
}
