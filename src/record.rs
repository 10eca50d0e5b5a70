//! The 21-field policy record produced by the extraction pipeline.
//!
//! A [`PolicyRecord`] always holds exactly one value per [`PolicyField`]:
//! the storage is a fixed-size array indexed by the field enum, so "more or
//! fewer than 21 keys" cannot be represented. Every value is either a
//! populated string or the sentinel [`NOT_AVAILABLE`].
//!
//! Degraded extractions are signalled inside the data itself: the failure
//! record carries [`EXTRACTION_FAILED`] in `Insurance_company_name` and
//! [`FAILURE_POLICY_NUMBER`] in `Insurance_policy_number`. Downstream
//! consumers built against that contract keep working; new code should prefer
//! [`crate::extractor::ExtractionOutcome`], which wraps the same record in a
//! tagged success/failure type.

use crate::date::normalize_date;
use crate::error::ExtractionFailure;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Sentinel for "field not found in the document".
pub const NOT_AVAILABLE: &str = "NA";

/// Company-name sentinel carried by the failure record.
pub const EXTRACTION_FAILED: &str = "EXTRACTION_FAILED";

/// Policy-number sentinel carried by the failure record.
pub const FAILURE_POLICY_NUMBER: &str = "Check logs - OpenAI error";

/// One of the 21 fixed output fields, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyField {
    InsuranceCompanyName,
    InsurancePlanName,
    InsurancePolicyType,
    InsurancePolicyNumber,
    VehicleRegistrationNumber,
    EngineNumber,
    ChassisNumber,
    PolicyholderName,
    PolicyholderAddress,
    PolicyholderPhoneNumber,
    PolicyholderEmailid,
    IntermediaryCode,
    IntermediaryName,
    IntermediaryPhoneNumber,
    IntermediaryEmailid,
    TotalPremiumPaid,
    OwnDamagePremium,
    BasePremium,
    PolicyStartDate,
    PolicyExpiryDate,
    PolicyIssuanceDate,
}

impl PolicyField {
    /// Number of fields in a record.
    pub const COUNT: usize = 21;

    /// Every field, in output order.
    pub const ALL: [PolicyField; Self::COUNT] = [
        PolicyField::InsuranceCompanyName,
        PolicyField::InsurancePlanName,
        PolicyField::InsurancePolicyType,
        PolicyField::InsurancePolicyNumber,
        PolicyField::VehicleRegistrationNumber,
        PolicyField::EngineNumber,
        PolicyField::ChassisNumber,
        PolicyField::PolicyholderName,
        PolicyField::PolicyholderAddress,
        PolicyField::PolicyholderPhoneNumber,
        PolicyField::PolicyholderEmailid,
        PolicyField::IntermediaryCode,
        PolicyField::IntermediaryName,
        PolicyField::IntermediaryPhoneNumber,
        PolicyField::IntermediaryEmailid,
        PolicyField::TotalPremiumPaid,
        PolicyField::OwnDamagePremium,
        PolicyField::BasePremium,
        PolicyField::PolicyStartDate,
        PolicyField::PolicyExpiryDate,
        PolicyField::PolicyIssuanceDate,
    ];

    /// The three date fields rendered as `DD/MM/YYYY`.
    pub const DATES: [PolicyField; 3] = [
        PolicyField::PolicyStartDate,
        PolicyField::PolicyExpiryDate,
        PolicyField::PolicyIssuanceDate,
    ];

    /// The JSON key for this field.
    pub const fn as_str(self) -> &'static str {
        match self {
            PolicyField::InsuranceCompanyName => "Insurance_company_name",
            PolicyField::InsurancePlanName => "Insurance_plan_name",
            PolicyField::InsurancePolicyType => "Insurance_policy_type",
            PolicyField::InsurancePolicyNumber => "Insurance_policy_number",
            PolicyField::VehicleRegistrationNumber => "Vehicle_registration_number",
            PolicyField::EngineNumber => "Engine_number",
            PolicyField::ChassisNumber => "Chassis_number",
            PolicyField::PolicyholderName => "Policyholder_name",
            PolicyField::PolicyholderAddress => "Policyholder_address",
            PolicyField::PolicyholderPhoneNumber => "Policyholder_phone_number",
            PolicyField::PolicyholderEmailid => "Policyholder_emailid",
            PolicyField::IntermediaryCode => "Intermediary_code",
            PolicyField::IntermediaryName => "Intermediary_name",
            PolicyField::IntermediaryPhoneNumber => "Intermediary_phone_number",
            PolicyField::IntermediaryEmailid => "Intermediary_emailid",
            PolicyField::TotalPremiumPaid => "Total_premium_paid",
            PolicyField::OwnDamagePremium => "Own_damage_premium",
            PolicyField::BasePremium => "Base_premium",
            PolicyField::PolicyStartDate => "Policy_start_date",
            PolicyField::PolicyExpiryDate => "Policy_expiry_date",
            PolicyField::PolicyIssuanceDate => "Policy_issuance_date",
        }
    }

    /// Look a field up by its exact JSON key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PolicyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown policy field '{s}'"))
    }
}

/// A complete 21-field policy record.
#[derive(Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    values: [String; PolicyField::COUNT],
}

impl PolicyRecord {
    /// A record with every field set to `"NA"`.
    pub fn not_available() -> Self {
        Self {
            values: std::array::from_fn(|_| NOT_AVAILABLE.to_string()),
        }
    }

    /// The diagnostic record returned when extraction fails.
    pub fn extraction_failed() -> Self {
        let mut record = Self::not_available();
        record.set(PolicyField::InsuranceCompanyName, EXTRACTION_FAILED);
        record.set(PolicyField::InsurancePolicyNumber, FAILURE_POLICY_NUMBER);
        record
    }

    /// True when this is (or looks like) the diagnostic failure record.
    pub fn is_extraction_failed(&self) -> bool {
        self.get(PolicyField::InsuranceCompanyName) == EXTRACTION_FAILED
    }

    pub fn get(&self, field: PolicyField) -> &str {
        &self.values[field.index()]
    }

    /// Set a field. Blank values are stored as `"NA"`.
    pub fn set(&mut self, field: PolicyField, value: impl Into<String>) {
        let value = value.into();
        self.values[field.index()] = if value.trim().is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            value
        };
    }

    /// True when the field holds something other than `"NA"`.
    pub fn is_populated(&self, field: PolicyField) -> bool {
        self.get(field) != NOT_AVAILABLE
    }

    /// Number of fields holding a value other than `"NA"`.
    pub fn populated_count(&self) -> usize {
        PolicyField::ALL
            .iter()
            .filter(|f| self.is_populated(**f))
            .count()
    }

    /// Iterate `(field, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PolicyField, &str)> + '_ {
        PolicyField::ALL
            .iter()
            .map(move |f| (*f, self.values[f.index()].as_str()))
    }

    /// Conform a parsed LLM response into a record.
    ///
    /// The value must be a JSON object. Known keys are copied; missing keys
    /// become `"NA"`; unknown keys are dropped. `null` and blank strings
    /// become `"NA"`, numbers and booleans are stringified, nested values are
    /// kept as compact JSON text. A response that already carries all 21
    /// string keys is returned unchanged.
    pub fn from_json_value(value: Value) -> Result<Self, ExtractionFailure> {
        let Value::Object(map) = value else {
            return Err(ExtractionFailure::SchemaViolation {
                detail: format!("expected a JSON object, got {}", json_kind(&value)),
            });
        };
        Ok(Self::from_json_map(&map))
    }

    fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut record = Self::not_available();
        let mut missing = 0usize;
        for field in PolicyField::ALL {
            match map.get(field.as_str()) {
                Some(v) => record.set(field, stringify_value(v)),
                None => missing += 1,
            }
        }
        let unknown = map
            .keys()
            .filter(|k| PolicyField::from_key(k).is_none())
            .count();
        if missing > 0 || unknown > 0 {
            debug!(
                "Conformed LLM record: {} missing keys filled with NA, {} unknown keys dropped",
                missing, unknown
            );
        }
        record
    }

    /// Render the three date fields as `DD/MM/YYYY`, or `"NA"` when a value
    /// matches none of the accepted date shapes.
    pub fn normalize_dates(&mut self) {
        for field in PolicyField::DATES {
            let normalised = normalize_date(self.get(field));
            self.set(field, normalised);
        }
    }

    /// Fill every `"NA"` field of `self` from `other`, ignoring placeholder
    /// values (`NA`, `NONE`, `NULL`, blank) in `other`. Values already present
    /// in `self` are never overwritten, so the first record merged wins.
    pub fn merge_missing(&mut self, other: &PolicyRecord) {
        for field in PolicyField::ALL {
            if self.is_populated(field) {
                continue;
            }
            let candidate = other.get(field).trim();
            if !is_placeholder(candidate) {
                self.set(field, candidate);
            }
        }
    }

    /// The record as a JSON object with the 21 keys in canonical order.
    pub fn to_json_value(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(f, v)| (f.as_str().to_string(), Value::String(v.to_string())))
            .collect();
        Value::Object(map)
    }
}

impl Default for PolicyRecord {
    fn default() -> Self {
        Self::not_available()
    }
}

impl fmt::Debug for PolicyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for PolicyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PolicyField::COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PolicyRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PolicyRecord::from_json_value(value).map_err(D::Error::custom)
    }
}

fn stringify_value(v: &Value) -> String {
    match v {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty()
        || value.eq_ignore_ascii_case("na")
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("null")
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
