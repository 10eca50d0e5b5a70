//! Configuration types for policy extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a
//! config can be cloned into concurrent tasks and logged as a whole.

use crate::error::PolicyExtractError;
use crate::pipeline::llm::PolicyTransport;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Versioned model used when none is configured.
///
/// Pinned to a dated snapshot so extraction output does not drift when the
/// provider moves a floating alias. The model must accept image input for
/// the vision fallback.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-2024-07-18";

/// Page-sampling and text-length budget applied before the LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionBudget {
    /// Pages with fewer whitespace-separated tokens are treated as empty. Default: 50.
    pub min_words_per_page: usize,

    /// Scanning stops once the page index exceeds this value. Default: 4.
    pub max_scan_index: usize,

    /// Hard cap on the characters handed to the LLM. Default: 8000.
    pub max_characters: usize,
}

impl Default for ExtractionBudget {
    fn default() -> Self {
        Self {
            min_words_per_page: 50,
            max_scan_index: 4,
            max_characters: 8000,
        }
    }
}

/// Rates for the per-document cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    /// USD charged per token. Default: 0.0000015.
    pub usd_per_token: f64,
    /// Tokens added to the word count for the prompt scaffolding. Default: 400.
    pub overhead_tokens: usize,
    /// USD → INR conversion rate. Default: 84.
    pub inr_per_usd: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            usd_per_token: 0.000_001_5,
            overhead_tokens: 400,
            inr_per_usd: 84.0,
        }
    }
}

/// Configuration for one or more policy extractions.
///
/// # Example
/// ```rust
/// use policy_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_tokens(800)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Page-sampling budget.
    pub budget: ExtractionBudget,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "azure", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Injected transport. Takes precedence over every provider setting.
    pub transport: Option<Arc<dyn PolicyTransport>>,

    /// Output-token ceiling for the extraction call. Default: 800.
    ///
    /// A fully populated 21-field record is roughly 400 tokens.
    pub max_tokens: usize,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for reading and sampling the PDF in seconds. Default: 60.
    ///
    /// On expiry the result is degraded at once, but the pdfium work already
    /// running on the blocking pool is not cancelled and runs to completion
    /// in the background.
    pub decode_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Expected maximum page count. Bounds how many pages are pulled from
    /// the decoder during sampling; never rejects a longer document.
    pub max_pages: Option<usize>,

    /// Documents processed at once by [`crate::stream::extract_stream`]. Default: 4.
    pub concurrency: usize,

    /// Render the three date fields as `DD/MM/YYYY` after extraction. Default: true.
    pub normalize_dates: bool,

    /// Return the all-`"NA"` record without an LLM call when sampling yields
    /// no text. Default: false.
    pub skip_llm_on_empty_text: bool,

    /// Send rendered page images to the LLM when sampling yields no text
    /// (scanned policies). Default: false.
    pub vision_fallback: bool,

    /// Pages rendered by the vision fallback. Default: 3.
    pub vision_max_pages: usize,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Cost-estimate rates.
    pub cost_rates: CostRates,

    /// Receives per-document progress events from batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            budget: ExtractionBudget::default(),
            model: None,
            provider_name: None,
            provider: None,
            transport: None,
            max_tokens: 800,
            api_timeout_secs: 60,
            decode_timeout_secs: 60,
            download_timeout_secs: 120,
            password: None,
            max_pages: None,
            concurrency: 4,
            normalize_dates: true,
            skip_llm_on_empty_text: false,
            vision_fallback: false,
            vision_max_pages: 3,
            max_rendered_pixels: 2000,
            cost_rates: CostRates::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("budget", &self.budget)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("transport", &self.transport.as_ref().map(|_| "<dyn PolicyTransport>"))
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("decode_timeout_secs", &self.decode_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("normalize_dates", &self.normalize_dates)
            .field("skip_llm_on_empty_text", &self.skip_llm_on_empty_text)
            .field("vision_fallback", &self.vision_fallback)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested.
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn budget(mut self, budget: ExtractionBudget) -> Self {
        self.config.budget = budget;
        self
    }

    pub fn min_words_per_page(mut self, n: usize) -> Self {
        self.config.budget.min_words_per_page = n;
        self
    }

    pub fn max_characters(mut self, n: usize) -> Self {
        self.config.budget.max_characters = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn PolicyTransport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn decode_timeout_secs(mut self, secs: u64) -> Self {
        self.config.decode_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn normalize_dates(mut self, v: bool) -> Self {
        self.config.normalize_dates = v;
        self
    }

    pub fn skip_llm_on_empty_text(mut self, v: bool) -> Self {
        self.config.skip_llm_on_empty_text = v;
        self
    }

    pub fn vision_fallback(mut self, v: bool) -> Self {
        self.config.vision_fallback = v;
        self
    }

    pub fn vision_max_pages(mut self, n: usize) -> Self {
        self.config.vision_max_pages = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn cost_rates(mut self, rates: CostRates) -> Self {
        self.config.cost_rates = rates;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PolicyExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PolicyExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.budget.max_characters == 0 {
            return Err(PolicyExtractError::InvalidConfig(
                "max_characters must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.decode_timeout_secs == 0 {
            return Err(PolicyExtractError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.cost_rates.usd_per_token < 0.0 || c.cost_rates.inr_per_usd < 0.0 {
            return Err(PolicyExtractError::InvalidConfig(
                "cost rates must not be negative".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.budget.min_words_per_page, 50);
        assert_eq!(c.budget.max_scan_index, 4);
        assert_eq!(c.budget.max_characters, 8000);
        assert_eq!(c.max_tokens, 800);
        assert_eq!(c.model_id(), DEFAULT_MODEL);
        assert!(c.normalize_dates);
        assert!(!c.vision_fallback);
    }

    #[test]
    fn builder_clamps() {
        let c = ExtractionConfig::builder()
            .concurrency(0)
            .vision_max_pages(0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.vision_max_pages, 1);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = ExtractionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, PolicyExtractError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ExtractionConfig::builder()
            .api_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn model_override() {
        let c = ExtractionConfig::builder().model("gpt-4.1-mini").build().unwrap();
        assert_eq!(c.model_id(), "gpt-4.1-mini");
    }

    #[test]
    fn debug_hides_provider_objects() {
        let dbg = format!("{:?}", ExtractionConfig::default());
        assert!(dbg.contains("max_tokens"));
        assert!(!dbg.contains("progress_callback"));
    }
}
