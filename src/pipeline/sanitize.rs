//! Response sanitisation: turn raw LLM text into a [`PolicyRecord`].
//!
//! Even in JSON-only mode some models wrap the object in ```` ```json ````
//! fences. Fences are removed wherever they appear, the remainder is trimmed
//! and parsed. Anything that is not a JSON object is a schema violation.

use crate::error::ExtractionFailure;
use crate::record::PolicyRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*").unwrap());
static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*").unwrap());

/// Remove every ```` ```json ```` and ```` ``` ```` marker (with trailing
/// whitespace) and trim the result.
pub fn strip_fences(input: &str) -> String {
    let s = RE_JSON_FENCE.replace_all(input, "");
    let s = RE_FENCE.replace_all(&s, "");
    s.trim().to_string()
}

/// Sanitise and parse an LLM response into a record.
pub fn parse_record(raw: &str) -> Result<PolicyRecord, ExtractionFailure> {
    let cleaned = strip_fences(raw);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ExtractionFailure::SchemaViolation {
            detail: format!("invalid JSON: {e}"),
        })?;
    PolicyRecord::from_json_value(value)
}
