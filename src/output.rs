//! Result types returned by the extraction pipeline.

use crate::config::CostRates;
use crate::error::ExtractionFailure;
use crate::record::PolicyRecord;
use serde::{Deserialize, Serialize};

/// The outcome of extracting one policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// The 21-field record. On a degraded extraction this is the diagnostic
    /// failure record.
    pub record: PolicyRecord,
    /// Total pages in the source document (0 when decoding timed out).
    pub page_count: usize,
    pub status: ExtractionStatus,
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// True when the record came back from the model intact.
    pub fn is_clean(&self) -> bool {
        matches!(self.status, ExtractionStatus::Clean)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ExtractionStatus::Degraded { .. })
    }
}

/// How the record in an [`ExtractionResult`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// The model returned a usable record.
    Clean,
    /// No text was sampled and the model was not called; every field is `"NA"`.
    NoText,
    /// The LLM stage failed and the failure record was substituted.
    Degraded { reason: ExtractionFailure },
}

/// Token usage reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Estimated processing cost of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Words in the sampled text plus the fixed prompt overhead.
    pub billed_tokens: usize,
    pub usd: f64,
    pub inr: f64,
}

impl CostEstimate {
    /// Estimate from the word count of the text sent to the model.
    pub fn from_words(words: usize, rates: &CostRates) -> Self {
        let billed_tokens = words + rates.overhead_tokens;
        let usd = billed_tokens as f64 * rates.usd_per_token;
        Self {
            billed_tokens,
            usd,
            inr: usd * rates.inr_per_usd,
        }
    }
}

/// Counters and timings for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub pages_scanned: usize,
    pub pages_skipped: usize,
    pub chars_sampled: usize,
    pub words_sampled: usize,
    /// True when the sampled text hit the character budget.
    pub truncated: bool,
    /// Page images sent to the model by the vision fallback.
    pub vision_pages: usize,
    pub usage: TokenUsage,
    pub cost: CostEstimate,
    pub decode_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_uses_word_count_plus_overhead() {
        let cost = CostEstimate::from_words(600, &CostRates::default());
        assert_eq!(cost.billed_tokens, 1000);
        assert!((cost.usd - 0.0015).abs() < 1e-12);
        assert!((cost.inr - 0.126).abs() < 1e-9);
    }

    #[test]
    fn empty_text_still_bills_overhead() {
        let cost = CostEstimate::from_words(0, &CostRates::default());
        assert_eq!(cost.billed_tokens, 400);
    }

    #[test]
    fn usage_accumulates() {
        let mut u = TokenUsage::default();
        u.add(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        });
        u.add(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
        });
        assert_eq!(u.total(), 17);
    }

    #[test]
    fn status_serialises_with_state_tag() {
        let clean = serde_json::to_value(ExtractionStatus::Clean).unwrap();
        assert_eq!(clean["state"], "clean");

        let degraded = ExtractionStatus::Degraded {
            reason: ExtractionFailure::DecodeTimeout { secs: 60 },
        };
        let v = serde_json::to_value(&degraded).unwrap();
        assert_eq!(v["state"], "degraded");
        assert_eq!(v["reason"]["kind"], "decode_timeout");
    }

    #[test]
    fn result_serialises_record_as_flat_object() {
        let result = ExtractionResult {
            record: PolicyRecord::not_available(),
            page_count: 3,
            status: ExtractionStatus::Clean,
            stats: ExtractionStats::default(),
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["record"]["Insurance_company_name"], "NA");
        assert_eq!(v["record"].as_object().unwrap().len(), 21);
        assert_eq!(v["page_count"], 3);
        assert!(result.is_clean());
    }
}
