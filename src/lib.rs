//! # policy-extract
//!
//! Extract a fixed 21-field structured record from insurance-policy PDFs
//! using a Large Language Model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file, URL download or in-memory bytes
//!  ├─ 2. Decode    pdfium text segments, page by page (spawn_blocking)
//!  ├─ 3. Sample    keep dense early pages, stop early, cap at 8000 chars
//!  ├─ 4. LLM       one JSON-mode call, temperature 0, under a timeout
//!  ├─ 5. Sanitise  strip fences, conform to the 21-field record
//!  └─ 6. Output    record + page count + status + stats
//! ```
//!
//! Scanned documents with no text layer can optionally be sent to a
//! vision-capable model as rendered page images instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use policy_extract::{extract_policy, ExtractionConfig, PolicyField};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER
//!     let config = ExtractionConfig::default();
//!     let result = extract_policy("policy.pdf", &config).await?;
//!     println!("{}", result.record.get(PolicyField::InsurancePolicyNumber));
//!     if result.record.is_extraction_failed() {
//!         eprintln!("LLM stage failed: {:?}", result.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Signalling
//!
//! Only unreadable documents return `Err`. When the LLM stage fails the
//! record is the diagnostic failure record (`Insurance_company_name =
//! "EXTRACTION_FAILED"`) and `status` carries the reason.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `policy-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! policy-extract = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod date;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CostRates, ExtractionBudget, ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use date::normalize_date;
pub use error::{ExtractionFailure, PolicyExtractError, TransportError};
pub use extractor::{ExtractionOutcome, ExtractorOptions, StructuredExtractor};
pub use orchestrator::{
    extract_policy, extract_policy_from_bytes, extract_policy_sync, extract_policy_to_file,
    extract_text, page_count, resolve_transport, sample_text,
};
pub use output::{CostEstimate, ExtractionResult, ExtractionStats, ExtractionStatus, TokenUsage};
pub use pipeline::llm::{PolicyTransport, ProviderTransport, TransportRequest, TransportResponse};
pub use pipeline::sampling::{sample_pages, PageSampler, SampledText};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_prompt, PromptPair};
pub use record::{PolicyField, PolicyRecord, EXTRACTION_FAILED, NOT_AVAILABLE};
pub use stream::{extract_batch, extract_stream, DocumentResult, PolicyStream};
