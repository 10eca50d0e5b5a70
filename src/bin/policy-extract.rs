//! CLI binary for policy-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use policy_extract::orchestrator::write_atomic;
use policy_extract::{
    extract_batch, page_count, sample_text, ExtractionConfig, ExtractionProgressCallback,
    ExtractionResult, ProgressCallback,
};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the batch, one log line per
/// document. Documents finish out of order when run concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    degraded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} policies  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            degraded: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, input: &str) {
        self.bar.set_message(input.to_string());
    }

    fn on_document_complete(&self, input: &str, populated: usize, degraded: bool) {
        let mark = if degraded {
            self.degraded.fetch_add(1, Ordering::SeqCst);
            yellow("⚠")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} {}  {}",
            mark,
            input,
            dim(&format!("{populated:>2}/21 fields")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, input: &str, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), input, red(first_line)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_documents.saturating_sub(success_count);
        let degraded = self.degraded.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} policies extracted  ({} degraded, {} failed)",
            if failed == 0 && degraded == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            bold(&success_count.to_string()),
            total_documents,
            degraded,
            failed,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one policy (JSON on stdout)
  policy-extract policy.pdf

  # Several policies, four at a time, written to a file
  policy-extract -c 4 a.pdf b.pdf c.pdf -o results.json

  # Only the 21-field records, no status or stats
  policy-extract --records-only policy.pdf

  # Scanned policy: fall back to page images
  policy-extract --vision policy-scan.pdf

  # Inspect without an API key
  policy-extract --page-count policy.pdf
  policy-extract --text-only policy.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. policy_extract=debug
"#;

/// Extract structured records from insurance-policy PDFs with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "policy-extract",
    version,
    about = "Extract a 21-field structured record from insurance-policy PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "POLICY_EXTRACT_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "POLICY_EXTRACT_PASSWORD")]
    password: Option<String>,

    /// Expected maximum page count; bounds pages read while sampling.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Documents processed concurrently.
    #[arg(short, long, env = "POLICY_EXTRACT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Max LLM output tokens.
    #[arg(long, env = "POLICY_EXTRACT_MAX_TOKENS", default_value_t = 800)]
    max_tokens: usize,

    /// LLM call timeout in seconds.
    #[arg(long, env = "POLICY_EXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// PDF decoding timeout in seconds.
    #[arg(long, env = "POLICY_EXTRACT_DECODE_TIMEOUT", default_value_t = 60)]
    decode_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "POLICY_EXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Keep dates exactly as the model returned them.
    #[arg(long)]
    raw_dates: bool,

    /// Return an all-NA record instead of calling the LLM when no text is found.
    #[arg(long)]
    skip_empty: bool,

    /// Send page images to the model when no text is found (scanned policies).
    #[arg(long)]
    vision: bool,

    /// Pages rendered by --vision.
    #[arg(long, default_value_t = 3)]
    vision_pages: usize,

    /// Print only the 21-field records.
    #[arg(long)]
    records_only: bool,

    /// Print the sampled text that would be sent to the model, then exit.
    #[arg(long, conflicts_with = "page_count")]
    text_only: bool,

    /// Print each document's page count, then exit.
    #[arg(long)]
    page_count: bool,

    /// Disable progress bar.
    #[arg(long, env = "POLICY_EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "POLICY_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.text_only && !cli.page_count;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect modes ────────────────────────────────────────────────────
    if cli.page_count {
        for input in &cli.inputs {
            let n = page_count(input)
                .await
                .with_context(|| format!("Failed to count pages of {input}"))?;
            println!("{n}\t{input}");
        }
        return Ok(());
    }

    if cli.text_only {
        for input in &cli.inputs {
            let sample = sample_text(input, &config)
                .await
                .with_context(|| format!("Failed to read text from {input}"))?;
            if cli.inputs.len() > 1 {
                eprintln!(
                    "{}",
                    dim(&format!(
                        "── {input}: {} chars, {} pages scanned, {} skipped ──",
                        sample.char_count(),
                        sample.pages_scanned,
                        sample.pages_skipped
                    ))
                );
            }
            println!("{}", sample.text);
        }
        return Ok(());
    }

    // ── Extract ──────────────────────────────────────────────────────────
    let results = extract_batch(cli.inputs.clone(), &config).await;

    let mut failures = 0usize;
    let mut values = Vec::with_capacity(results.len());
    for (input, result) in results {
        match result {
            Ok(r) => values.push(render_result(&input, &r, cli.records_only)?),
            Err(e) => {
                failures += 1;
                if !show_progress {
                    eprintln!("{} {}: {}", red("error:"), input, e);
                }
                values.push(serde_json::json!({ "input": input, "error": e.to_string() }));
            }
        }
    }

    let payload = if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Array(values)
    };
    let json = serde_json::to_string_pretty(&payload).context("Failed to serialise output")?;

    if let Some(ref output_path) = cli.output {
        write_atomic(output_path, json.as_bytes())
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!("→ {}", bold(&output_path.display().to_string()));
        }
    } else {
        println!("{json}");
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} documents could not be read", cli.inputs.len());
    }
    Ok(())
}

/// JSON for one successful document.
fn render_result(input: &str, result: &ExtractionResult, records_only: bool) -> Result<Value> {
    if records_only {
        return serde_json::to_value(&result.record).context("Failed to serialise record");
    }
    let mut value = serde_json::to_value(result).context("Failed to serialise result")?;
    if let Value::Object(ref mut map) = value {
        map.insert("input".to_string(), Value::String(input.to_string()));
    }
    Ok(value)
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .decode_timeout_secs(cli.decode_timeout)
        .download_timeout_secs(cli.download_timeout)
        .normalize_dates(!cli.raw_dates)
        .skip_llm_on_empty_text(cli.skip_empty)
        .vision_fallback(cli.vision)
        .vision_max_pages(cli.vision_pages);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
