//! Pipeline stages for policy extraction.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf + sampling ──▶ llm ──▶ sanitize
//! (path/URL/bytes)  (pdfium text)  (transport)  (fences → record)
//!
//! vision fallback, when sampling yields no text:
//! render ──▶ encode ──▶ llm ──▶ sanitize
//! ```
//!
//! 1. [`input`]    : canonicalise the user-supplied path, URL or bytes to a local file
//! 2. [`pdf`]      : bind pdfium and pull page text; blocking, wrapped in `spawn_blocking`
//! 3. [`sampling`] : keep dense early pages, stop early, cap the character count
//! 4. [`llm`]      : the transport seam; the only stage with network I/O
//! 5. [`sanitize`] : strip code fences and conform the JSON to the 21-field record
//! 6. [`render`] / [`encode`] : rasterise and PNG-encode pages for the vision fallback

pub mod encode;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod render;
pub mod sampling;
pub mod sanitize;
