//! Pipeline integration tests.
//!
//! The first group needs no PDF engine. The second group decodes synthetic
//! PDFs through pdfium and skips itself when no pdfium library can be bound
//! (set `PDFIUM_LIB_PATH` to run it). No test makes network calls.

mod common;

use common::{
    build_pdf, init_tracing, pdfium_available, words, write_temp_pdf, FakeTransport,
    MOTOR_POLICY_REPLY,
};
use policy_extract::{
    extract_policy, extract_policy_from_bytes, extract_text, normalize_date, page_count,
    sample_pages, sample_text, ExtractionBudget, ExtractionConfig, ExtractionStatus,
    ExtractorOptions, PolicyExtractError, PolicyField, PolicyRecord, StructuredExtractor, TransportError,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn config_with(transport: Arc<FakeTransport>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .transport(transport)
        .build()
        .unwrap()
}

// ── No PDF engine required ───────────────────────────────────────────────────

#[test]
fn sampling_reads_two_dense_pages() {
    let pages = vec![words("p1", 80), words("p2", 80), words("p3", 80)];
    let sample = sample_pages(pages, ExtractionBudget::default());
    assert_eq!(sample.pages_scanned, 2);
    assert!(sample.text.contains("p2w79"));
    assert!(!sample.text.contains("p3w0"));
}

#[test]
fn sampling_never_exceeds_budget() {
    let pages: Vec<Vec<String>> = (0..6).map(|i| words(&format!("page{i}"), 1500)).collect();
    let sample = sample_pages(pages, ExtractionBudget::default());
    assert!(sample.char_count() <= 8000);
    assert!(sample.truncated);
}

#[test]
fn date_normaliser_output_is_canonical_or_na() {
    assert_eq!(normalize_date("2024-05-01"), "01/05/2024");
    assert_eq!(normalize_date("Apr 28, 2024"), "28/04/2024");
    assert_eq!(normalize_date("28th April"), "NA");
}

#[test]
fn record_json_has_exactly_21_keys() {
    let json = serde_json::to_value(PolicyRecord::extraction_failed()).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 21);
    assert_eq!(obj["Insurance_company_name"], "EXTRACTION_FAILED");
    assert_eq!(obj["Insurance_policy_number"], "Check logs - OpenAI error");
    assert_eq!(obj.values().filter(|v| *v == "NA").count(), 19);
}

#[tokio::test]
async fn extractor_returns_model_record() {
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let extractor = StructuredExtractor::new(transport.clone(), ExtractorOptions::default());
    let record = extractor.extract_fields("POLICY SCHEDULE ...").await;
    assert_eq!(record.populated_count(), 21);
    assert_eq!(record.get(PolicyField::VehicleRegistrationNumber), "MH01AB1234");
    // the extractor leaves dates as returned
    assert_eq!(record.get(PolicyField::PolicyStartDate), "2024-05-01");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn extractor_auth_failure_is_sentinel() {
    let transport = Arc::new(FakeTransport::failing(TransportError::Auth {
        detail: "401".into(),
    }));
    let extractor = StructuredExtractor::new(transport, ExtractorOptions::default());
    let outcome = extractor.extract("text").await;
    assert!(outcome.is_degraded());
    assert!(outcome.record().is_extraction_failed());
}

#[tokio::test]
async fn not_a_pdf_is_rejected_before_any_llm_call() {
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let err = assert_err!(
        extract_policy_from_bytes(b"<!doctype html>", &config_with(transport.clone())).await
    );
    assert!(matches!(err, PolicyExtractError::NotAPdf { .. }));
    assert_eq!(transport.call_count(), 0);
}

// ── pdfium-backed ────────────────────────────────────────────────────────────

#[tokio::test]
async fn page_count_matches_document() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 60), words("b", 60), words("c", 60)]));
    let n = assert_ok!(page_count(pdf.path().to_str().unwrap()).await);
    assert_eq!(n, 3);
}

#[tokio::test]
async fn sample_text_stops_after_second_dense_page() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 60), words("b", 60), words("c", 60)]));
    let sample = sample_text(pdf.path().to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(sample.pages_scanned, 2);
    assert!(sample.text.contains("aw0"));
    assert!(sample.text.contains("bw59"));
    assert!(!sample.text.contains("cw0"));

    let text = extract_text(pdf.path().to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(text, sample.text);
}

#[tokio::test]
async fn sparse_cover_page_is_skipped() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[
        vec!["COVER".to_string()],
        words("b", 60),
        words("c", 60),
        words("d", 60),
    ]));
    let sample = sample_text(pdf.path().to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(sample.pages_scanned, 3);
    assert_eq!(sample.pages_skipped, 1);
    assert!(!sample.text.contains("COVER"));
    assert!(sample.text.contains("cw0"));
    assert!(!sample.text.contains("dw0"));
}

#[tokio::test]
async fn dense_then_two_sparse_keeps_only_first_page() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 200), words("b", 10), words("c", 10)]));
    let sample = sample_text(pdf.path().to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(sample.pages_scanned, 3);
    assert_eq!(sample.pages_skipped, 2);
    assert_eq!(sample.word_count(), 200);
    assert!(!sample.text.contains("bw0"));
}

#[tokio::test]
async fn max_pages_hint_bounds_sampling() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 60), words("b", 60)]));
    let config = ExtractionConfig::builder().max_pages(1).build().unwrap();
    let sample = sample_text(pdf.path().to_str().unwrap(), &config).await.unwrap();
    assert_eq!(sample.pages_scanned, 1);
    assert!(!sample.text.contains("bw0"));
}

#[tokio::test]
async fn extract_policy_end_to_end_with_fake_transport() {
    if !pdfium_available() {
        return;
    }
    init_tracing();
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 60), words("b", 60), words("c", 60)]));
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let result = extract_policy(pdf.path().to_str().unwrap(), &config_with(transport.clone()))
        .await
        .unwrap();

    assert!(result.is_clean());
    assert_eq!(result.page_count, 3);
    assert_eq!(result.record.get(PolicyField::PolicyStartDate), "01/05/2024");
    assert_eq!(result.record.get(PolicyField::PolicyIssuanceDate), "28/04/2024");
    assert_eq!(result.stats.usage.total(), 800);
    assert_eq!(transport.call_count(), 1);

    let prompt = transport.last_user_prompt().unwrap();
    assert!(prompt.contains("aw0"));
    assert!(!prompt.contains("cw0"));
}

#[tokio::test]
async fn bytes_input_matches_path_input() {
    if !pdfium_available() {
        return;
    }
    let bytes = build_pdf(&[words("a", 60), words("b", 60)]);
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let result = extract_policy_from_bytes(&bytes, &config_with(transport))
        .await
        .unwrap();
    assert_eq!(result.page_count, 2);
    assert_eq!(result.record.populated_count(), 21);
}

#[tokio::test]
async fn empty_document_can_skip_llm() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[vec!["x".to_string()], vec!["y".to_string()]]));
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let config = ExtractionConfig::builder()
        .transport(transport.clone())
        .skip_llm_on_empty_text(true)
        .build()
        .unwrap();
    let result = extract_policy(pdf.path().to_str().unwrap(), &config).await.unwrap();
    assert_eq!(result.status, ExtractionStatus::NoText);
    assert_eq!(result.record.populated_count(), 0);
    assert_eq!(result.page_count, 2);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn llm_failure_keeps_page_count() {
    if !pdfium_available() {
        return;
    }
    let pdf = write_temp_pdf(&build_pdf(&[words("a", 60)]));
    let transport = Arc::new(FakeTransport::replying("I could not find a policy."));
    let result = extract_policy(pdf.path().to_str().unwrap(), &config_with(transport))
        .await
        .unwrap();
    assert!(result.is_degraded());
    assert!(result.record.is_extraction_failed());
    assert_eq!(result.page_count, 1);
}

#[tokio::test]
async fn truncated_pdf_is_corrupt() {
    if !pdfium_available() {
        return;
    }
    let transport = Arc::new(FakeTransport::replying(MOTOR_POLICY_REPLY));
    let err = extract_policy_from_bytes(b"%PDF-1.4\n1 0 obj\n<<", &config_with(transport))
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyExtractError::CorruptPdf { .. }), "got {err:?}");
}
