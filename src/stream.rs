//! Batch extraction: run many documents concurrently, emit results as ready.
//!
//! Each document is an independent [`extract_policy`] call. Up to
//! `config.concurrency` run at once via `buffer_unordered`, so results arrive
//! in completion order. Use [`extract_batch`] when input order matters.

use crate::config::ExtractionConfig;
use crate::error::PolicyExtractError;
use crate::orchestrator::extract_policy;
use crate::output::ExtractionResult;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// One finished document: the input as given plus its result.
pub type DocumentResult = (String, Result<ExtractionResult, PolicyExtractError>);

/// A boxed stream of document results.
pub type PolicyStream = Pin<Box<dyn Stream<Item = DocumentResult> + Send>>;

type IndexedResult = (usize, DocumentResult);

/// Extract every input, yielding results as each document completes.
///
/// Fatal errors for one document are yielded as that document's `Err` and
/// never stop the batch.
///
/// # Example
/// ```rust,no_run
/// use policy_extract::{extract_stream, ExtractionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = ExtractionConfig::default();
/// let mut results = extract_stream(["a.pdf", "b.pdf"], &config);
/// while let Some((input, result)) = results.next().await {
///     match result {
///         Ok(r) => println!("{input}: {} fields", r.record.populated_count()),
///         Err(e) => eprintln!("{input}: {e}"),
///     }
/// }
/// # }
/// ```
pub fn extract_stream<I, S>(inputs: I, config: &ExtractionConfig) -> PolicyStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Box::pin(indexed_stream(inputs, config).map(|(_, item)| item))
}

/// Extract every input and return the results in input order.
pub async fn extract_batch<I, S>(inputs: I, config: &ExtractionConfig) -> Vec<DocumentResult>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut results: Vec<IndexedResult> = indexed_stream(inputs, config).collect().await;
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, item)| item).collect()
}

fn indexed_stream<I, S>(
    inputs: I,
    config: &ExtractionConfig,
) -> Pin<Box<dyn Stream<Item = IndexedResult> + Send>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
    let total = inputs.len();
    info!(
        "Starting batch of {} documents (concurrency {})",
        total, config.concurrency
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let succeeded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&succeeded);
    let cfg = config.clone();

    let documents = stream::iter(inputs.into_iter().enumerate())
        .map(move |(idx, input)| {
            let cfg = cfg.clone();
            let counter = Arc::clone(&counter);
            async move {
                let result = extract_policy(&input, &cfg).await;
                if result.is_ok() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                (idx, (input, result))
            }
        })
        .buffer_unordered(config.concurrency.max(1));

    let callback = config.progress_callback.clone();
    let finished = stream::once(async move {
        let ok = succeeded.load(Ordering::SeqCst);
        info!("Batch complete: {}/{} documents extracted", ok, total);
        if let Some(cb) = callback {
            cb.on_batch_complete(total, ok);
        }
    })
    .filter_map(|()| futures::future::ready(None::<IndexedResult>));

    Box::pin(documents.chain(finished))
}
