//! Error types for the policy-extract library.
//!
//! Two tiers of failure exist, and they travel differently:
//!
//! * [`PolicyExtractError`] is **fatal**: the document cannot be read at all
//!   (missing file, not a PDF, corrupt or encrypted PDF, provider not
//!   configured). Returned as `Err(PolicyExtractError)` from the top-level
//!   `extract_policy*` functions.
//!
//! * [`ExtractionFailure`] is **recovered**: the text was read but the LLM
//!   stage failed (transport error, timeout, unparseable response). These
//!   never surface as `Err`; the pipeline substitutes the diagnostic fallback
//!   record and attaches the failure as the reason of a degraded outcome.
//!
//! [`TransportError`] is the error surface of a single transport call and is
//! always folded into an [`ExtractionFailure`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the policy-extract library.
#[derive(Debug, Error)]
pub enum PolicyExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Text could not be read from a page that pdfium did load.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place libpdfium next to the binary,\n\
or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single LLM transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TransportError {
    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// HTTP 429 from the provider.
    #[error("Rate limit exceeded: {detail}")]
    RateLimited { detail: String },

    /// HTTP 401/403 from the provider.
    #[error("Authentication error: {detail}")]
    Auth { detail: String },

    /// Any other provider or network error.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The provider answered with no content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl TransportError {
    /// Classify a provider error message into a transport error.
    ///
    /// Providers surface status codes only inside their display strings, so
    /// classification is textual.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
            TransportError::RateLimited { detail: message }
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("api key")
        {
            TransportError::Auth { detail: message }
        } else {
            TransportError::Api { message }
        }
    }
}

/// Why an extraction was degraded to the diagnostic fallback record.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// The transport call failed.
    #[error("transport failure: {0}")]
    Transport(TransportError),

    /// The response was not a JSON object after sanitisation.
    #[error("schema violation: {detail}")]
    SchemaViolation { detail: String },

    /// Reading the PDF did not finish within the configured timeout.
    #[error("PDF decoding timed out after {secs}s")]
    DecodeTimeout { secs: u64 },

    /// Every rendered page failed during the vision fallback.
    #[error("vision fallback failed on all {pages} pages")]
    VisionPagesFailed { pages: usize },
}

impl From<TransportError> for ExtractionFailure {
    fn from(e: TransportError) -> Self {
        ExtractionFailure::Transport(e)
    }
}
