//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as [`crate::stream::extract_stream`] works through a batch of
//! policies. Single-document calls report start/complete/error for that
//! document only.
//!
//! # Example
//!
//! ```rust
//! use policy_extract::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, input: &str, populated: usize, degraded: bool) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{done} {input}: {populated}/21 fields (degraded={degraded})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each document.
///
/// Documents in a batch run concurrently, so every method may be called from
/// several threads at once. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before a batch starts.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when work on a document begins.
    fn on_document_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when a document produced a record.
    ///
    /// # Arguments
    /// * `input`     : the path or URL as given
    /// * `populated` : fields holding a value other than `"NA"`
    /// * `degraded`  : true when the failure record was substituted
    fn on_document_complete(&self, input: &str, populated: usize, degraded: bool) {
        let _ = (input, populated, degraded);
    }

    /// Called when a document failed fatally (unreadable, not a PDF, ...).
    fn on_document_error(&self, input: &str, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every document in a batch has been attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
