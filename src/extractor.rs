//! Structured extraction: sampled text in, 21-field record out.
//!
//! [`StructuredExtractor`] builds the prompts, sends one request through the
//! injected [`PolicyTransport`] under a timeout, sanitises the response and
//! conforms it to a [`PolicyRecord`]. It never returns an error. Any failure
//! (transport error, timeout, malformed or non-object JSON) yields the
//! diagnostic failure record, tagged with the reason in a
//! [`ExtractionOutcome::Degraded`]. There are no retries.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionFailure, TransportError};
use crate::output::TokenUsage;
use crate::pipeline::llm::{PolicyTransport, TransportRequest};
use crate::pipeline::sanitize;
use crate::prompts::{build_prompt, build_vision_prompt, PromptPair};
use crate::record::PolicyRecord;
use edgequake_llm::ImageData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sampling temperature for every extraction call.
pub const TEMPERATURE: f32 = 0.0;

/// Per-call settings for [`StructuredExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Model named in logs. The orchestrator takes it from the resolved
    /// transport when the transport reports one.
    pub model: String,
    pub max_tokens: usize,
    pub api_timeout: Duration,
    /// Request a bare JSON object from the provider.
    pub json_mode: bool,
}

impl ExtractorOptions {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            model: config.model_id().to_string(),
            max_tokens: config.max_tokens,
            api_timeout: Duration::from_secs(config.api_timeout_secs),
            json_mode: true,
        }
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Record plus whether it is trustworthy.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// The model answered with a JSON object.
    Extracted(PolicyRecord),
    /// The LLM stage failed; `record` is the diagnostic failure record.
    Degraded {
        record: PolicyRecord,
        reason: ExtractionFailure,
    },
}

impl ExtractionOutcome {
    fn degraded(reason: ExtractionFailure) -> Self {
        ExtractionOutcome::Degraded {
            record: PolicyRecord::extraction_failed(),
            reason,
        }
    }

    pub fn record(&self) -> &PolicyRecord {
        match self {
            ExtractionOutcome::Extracted(r) => r,
            ExtractionOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> PolicyRecord {
        match self {
            ExtractionOutcome::Extracted(r) => r,
            ExtractionOutcome::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ExtractionOutcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionOutcome::Extracted(_) => None,
            ExtractionOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Turns document text (or page images) into a [`PolicyRecord`].
#[derive(Clone)]
pub struct StructuredExtractor {
    transport: Arc<dyn PolicyTransport>,
    options: ExtractorOptions,
}

impl std::fmt::Debug for StructuredExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredExtractor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl StructuredExtractor {
    pub fn new(transport: Arc<dyn PolicyTransport>, options: ExtractorOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Extract a record, returning the failure record on any error.
    pub async fn extract_fields(&self, text: &str) -> PolicyRecord {
        self.extract(text).await.into_record()
    }

    /// Extract a record from document text.
    pub async fn extract(&self, text: &str) -> ExtractionOutcome {
        self.extract_with_usage(text).await.0
    }

    /// [`extract`](Self::extract), also reporting token usage.
    pub async fn extract_with_usage(&self, text: &str) -> (ExtractionOutcome, TokenUsage) {
        info!(
            "Extracting policy fields from {} chars with {}",
            text.chars().count(),
            self.options.model
        );
        let request = self.request(build_prompt(text), Vec::new());

        match self.call(&request).await {
            Ok((record, usage)) => (ExtractionOutcome::Extracted(record), usage),
            Err(reason) => {
                warn!("Extraction degraded to failure record: {}", reason);
                (ExtractionOutcome::degraded(reason), TokenUsage::default())
            }
        }
    }

    /// Extract from rendered page images, one request per page.
    ///
    /// Per-page records are merged in page order: the first page with a
    /// real value for a field wins. If every page fails the outcome is
    /// degraded.
    pub async fn extract_from_images(
        &self,
        pages: Vec<(usize, ImageData)>,
    ) -> (ExtractionOutcome, TokenUsage) {
        let total = pages.len();
        let mut merged = PolicyRecord::not_available();
        let mut usage = TokenUsage::default();
        let mut succeeded = 0usize;

        for (idx, image) in pages {
            let request = self.request(build_vision_prompt(), vec![image]);
            match self.call(&request).await {
                Ok((record, page_usage)) => {
                    debug!(
                        "Vision page {}: {} fields populated",
                        idx + 1,
                        record.populated_count()
                    );
                    merged.merge_missing(&record);
                    usage.add(page_usage);
                    succeeded += 1;
                }
                Err(reason) => warn!("Vision page {} failed: {}", idx + 1, reason),
            }
        }

        if succeeded == 0 {
            warn!("Vision fallback failed on all {} pages", total);
            return (
                ExtractionOutcome::degraded(ExtractionFailure::VisionPagesFailed { pages: total }),
                usage,
            );
        }

        (ExtractionOutcome::Extracted(merged), usage)
    }

    fn request(&self, prompt: PromptPair, images: Vec<ImageData>) -> TransportRequest {
        TransportRequest {
            system_prompt: prompt.system,
            user_prompt: prompt.user,
            images,
            temperature: TEMPERATURE,
            max_tokens: self.options.max_tokens,
            json_mode: self.options.json_mode,
        }
    }

    /// One transport round trip under the timeout, then sanitise and parse.
    async fn call(
        &self,
        request: &TransportRequest,
    ) -> Result<(PolicyRecord, TokenUsage), ExtractionFailure> {
        let timeout = self.options.api_timeout;
        let response = tokio::time::timeout(timeout, self.transport.complete(request))
            .await
            .map_err(|_| TransportError::Timeout {
                secs: timeout.as_secs(),
            })??;

        debug!(
            "Raw response ({} chars): {}",
            response.content.len(),
            response.content.chars().take(200).collect::<String>()
        );

        let record = sanitize::parse_record(&response.content)?;
        Ok((
            record,
            TokenUsage {
                prompt_tokens: response.prompt_tokens,
                completion_tokens: response.completion_tokens,
            },
        ))
    }
}
