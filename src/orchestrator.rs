//! Single-document extraction entry points.
//!
//! ```text
//! resolve input ──▶ decode + sample (spawn_blocking, timeout)
//!               ──▶ StructuredExtractor (transport, timeout)
//!               ──▶ date normalisation ──▶ ExtractionResult
//! ```
//!
//! Only failures to read the document are returned as `Err`. Everything that
//! goes wrong after the text is in hand (LLM errors, timeouts, bad JSON, a
//! decode timeout) produces the diagnostic failure record inside an `Ok`.

use crate::config::ExtractionConfig;
use crate::error::{ExtractionFailure, PolicyExtractError};
use crate::extractor::{ExtractionOutcome, ExtractorOptions, StructuredExtractor};
use crate::output::{CostEstimate, ExtractionResult, ExtractionStats, ExtractionStatus, TokenUsage};
use crate::pipeline::llm::{PolicyTransport, ProviderTransport};
use crate::pipeline::pdf::{self, DecodedDocument};
use crate::pipeline::sampling::SampledText;
use crate::pipeline::{encode, input, render};
use crate::record::PolicyRecord;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extract the 21-field record from a PDF file or URL.
///
/// # Errors
/// Returns `Err(PolicyExtractError)` only when the document cannot be read:
/// missing file, not a PDF, corrupt or encrypted PDF, no pdfium library, or
/// no LLM provider configured.
pub async fn extract_policy(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let input_str = input_str.as_ref();
    notify_start(config, input_str);

    let result = extract_input(input_str, config).await;
    notify_end(config, input_str, &result);
    result
}

async fn extract_input(
    input_str: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    extract_resolved(resolved.path(), config).await
}

/// Extract from an in-memory PDF.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn extract_policy_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let resolved = input::resolve_bytes(bytes)?;
    extract_resolved(resolved.path(), config).await
}

/// Extract a policy and write the result as JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_policy_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let result = extract_policy(input_str, config).await?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| PolicyExtractError::Internal(format!("serialise result: {e}")))?;
    write_atomic(output_path.as_ref(), json.as_bytes()).await?;
    Ok(result)
}

/// Synchronous wrapper around [`extract_policy`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_policy_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PolicyExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_policy(input_str, config))
}

/// Total number of pages in a PDF. Does not require an LLM provider.
pub async fn page_count(input_str: impl AsRef<str>) -> Result<usize, PolicyExtractError> {
    let defaults = ExtractionConfig::default();
    let resolved = input::resolve_input(input_str.as_ref(), defaults.download_timeout_secs).await?;
    pdf::page_count(resolved.path(), None).await
}

/// The text that would be sent to the model. Does not require an LLM provider.
pub async fn sample_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<SampledText, PolicyExtractError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let decoded = pdf::decode(
        resolved.path(),
        config.password.as_deref(),
        config.budget,
        config.max_pages,
    )
    .await?;
    Ok(decoded.sample)
}

/// The sampled text as a plain string.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<String, PolicyExtractError> {
    Ok(sample_text(input_str, config).await?.text)
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PolicyExtractError> {
    let write_err = |e| PolicyExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Pipeline ─────────────────────────────────────────────────────────────

async fn extract_resolved(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let total_start = Instant::now();
    info!("Extracting policy: {}", pdf_path.display());

    // ── Step 1: Transport ────────────────────────────────────────────────
    let transport = resolve_transport(config)?;
    let options = extractor_options(config, transport.as_ref());
    let extractor = StructuredExtractor::new(transport, options);

    // ── Step 2: Decode + sample ──────────────────────────────────────────
    let decode_start = Instant::now();
    let decode = pdf::decode(
        pdf_path,
        config.password.as_deref(),
        config.budget,
        config.max_pages,
    );
    let decoded = match decode_with_timeout(decode, config.decode_timeout_secs).await? {
        DecodeOutcome::Ready(decoded) => decoded,
        DecodeOutcome::TimedOut(mut timed_out) => {
            warn!("{}: decode timed out", pdf_path.display());
            timed_out.stats.decode_duration_ms = decode_start.elapsed().as_millis() as u64;
            timed_out.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
            return Ok(*timed_out);
        }
    };
    let decode_duration_ms = decode_start.elapsed().as_millis() as u64;

    // ── Step 3: LLM ──────────────────────────────────────────────────────
    let mut result = extract_from_decoded(decoded, pdf_path, &extractor, config).await?;
    result.stats.decode_duration_ms = decode_duration_ms;
    result.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extracted {}/21 fields from {} ({} pages, {} tokens, ${:.6})",
        result.record.populated_count(),
        pdf_path.display(),
        result.page_count,
        result.stats.usage.total(),
        result.stats.cost.usd
    );

    Ok(result)
}

pub(crate) enum DecodeOutcome {
    Ready(DecodedDocument),
    /// The degraded failure result, `page_count = 0`.
    TimedOut(Box<ExtractionResult>),
}

/// Run `decode` under a timeout of `secs` seconds.
///
/// The timeout drops the future but cannot stop a `spawn_blocking` task
/// already running inside it.
pub(crate) async fn decode_with_timeout<F>(
    decode: F,
    secs: u64,
) -> Result<DecodeOutcome, PolicyExtractError>
where
    F: std::future::Future<Output = Result<DecodedDocument, PolicyExtractError>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), decode).await {
        Ok(decoded) => Ok(DecodeOutcome::Ready(decoded?)),
        Err(_) => Ok(DecodeOutcome::TimedOut(Box::new(ExtractionResult {
            record: PolicyRecord::extraction_failed(),
            page_count: 0,
            status: ExtractionStatus::Degraded {
                reason: ExtractionFailure::DecodeTimeout { secs },
            },
            stats: ExtractionStats::default(),
        }))),
    }
}

/// Everything after decoding: pick the text, vision or skip path, run the
/// extractor and assemble the result.
pub(crate) async fn extract_from_decoded(
    decoded: DecodedDocument,
    pdf_path: &Path,
    extractor: &StructuredExtractor,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, PolicyExtractError> {
    let DecodedDocument { sample, page_count } = decoded;
    let words = sample.word_count();

    let mut stats = ExtractionStats {
        pages_scanned: sample.pages_scanned,
        pages_skipped: sample.pages_skipped,
        chars_sampled: sample.char_count(),
        words_sampled: words,
        truncated: sample.truncated,
        ..Default::default()
    };

    let llm_start = Instant::now();
    let (outcome, usage): (ExtractionOutcome, TokenUsage) = if sample.is_empty() {
        if config.vision_fallback {
            info!("No text layer found; rendering pages for the vision fallback");
            let rendered = render::render_leading_pages(
                pdf_path,
                config.password.as_deref(),
                config.vision_max_pages,
                config.max_rendered_pixels,
            )
            .await?;
            let images = encode::encode_pages(&rendered);
            stats.vision_pages = images.len();
            extractor.extract_from_images(images).await
        } else if config.skip_llm_on_empty_text {
            info!("No text sampled; returning an empty record without calling the LLM");
            return Ok(ExtractionResult {
                record: PolicyRecord::not_available(),
                page_count,
                status: ExtractionStatus::NoText,
                stats,
            });
        } else {
            debug!("No text sampled; sending an empty document to the LLM");
            extractor.extract_with_usage(&sample.text).await
        }
    } else {
        extractor.extract_with_usage(&sample.text).await
    };
    stats.llm_duration_ms = llm_start.elapsed().as_millis() as u64;
    stats.usage = usage;
    stats.cost = CostEstimate::from_words(words, &config.cost_rates);

    let (record, status) = match outcome {
        ExtractionOutcome::Extracted(mut record) => {
            if config.normalize_dates {
                record.normalize_dates();
            }
            (record, ExtractionStatus::Clean)
        }
        ExtractionOutcome::Degraded { record, reason } => {
            (record, ExtractionStatus::Degraded { reason })
        }
    };

    Ok(ExtractionResult {
        record,
        page_count,
        status,
        stats,
    })
}

// ── Transport resolution ─────────────────────────────────────────────────

/// Resolve the transport, from most-specific to least-specific.
///
/// 1. **Injected transport** (`config.transport`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in a [`ProviderTransport`].
/// 3. **Named provider + model** (`config.provider_name`). The factory reads
///    the matching API key from the environment.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **OpenAI** when `OPENAI_API_KEY` is set, with the configured model.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_transport(
    config: &ExtractionConfig,
) -> Result<Arc<dyn PolicyTransport>, PolicyExtractError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(ProviderTransport::new(provider)))
}

/// Extractor options from `config`, naming the model the transport reports.
fn extractor_options(
    config: &ExtractionConfig,
    transport: &dyn PolicyTransport,
) -> ExtractorOptions {
    let mut options = ExtractorOptions::from_config(config);
    if let Some(model) = transport.model() {
        options.model = model.to_string();
    }
    options
}

fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, PolicyExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_id());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_id());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PolicyExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY or pass --provider/--model.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PolicyExtractError> {
    debug!("Creating provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PolicyExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

// ── Progress ─────────────────────────────────────────────────────────────

fn notify_start(config: &ExtractionConfig, input: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(input);
    }
}

fn notify_end(
    config: &ExtractionConfig,
    input: &str,
    result: &Result<ExtractionResult, PolicyExtractError>,
) {
    if let Some(ref cb) = config.progress_callback {
        match result {
            Ok(r) => cb.on_document_complete(input, r.record.populated_count(), r.is_degraded()),
            Err(e) => cb.on_document_error(input, &e.to_string()),
        }
    }
}
