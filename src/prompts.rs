//! Prompts for schema-constrained policy extraction.
//!
//! Every prompt lives here so changing the extraction contract means editing
//! one place, and so tests can inspect prompts without a live LLM. Prompt
//! construction is pure: the same document text always yields byte-identical
//! prompts.

/// System prompt naming the 21 output fields and the extraction rules.
pub const SYSTEM_PROMPT: &str = r#"You are an expert at extracting structured data from Indian insurance policy documents.

Extract EXACTLY these 21 fields and return ONLY a valid JSON object (no markdown, no explanation):

{
  "Insurance_company_name": "string or NA",
  "Insurance_plan_name": "string or NA",
  "Insurance_policy_type": "string or NA",
  "Insurance_policy_number": "string or NA",
  "Vehicle_registration_number": "string or NA",
  "Engine_number": "string or NA",
  "Chassis_number": "string or NA",
  "Policyholder_name": "string or NA",
  "Policyholder_address": "string or NA",
  "Policyholder_phone_number": "string or NA",
  "Policyholder_emailid": "string or NA",
  "Intermediary_code": "string or NA",
  "Intermediary_name": "string or NA",
  "Intermediary_phone_number": "string or NA",
  "Intermediary_emailid": "string or NA",
  "Total_premium_paid": "string or NA",
  "Own_damage_premium": "string or NA",
  "Base_premium": "string or NA",
  "Policy_start_date": "string or NA",
  "Policy_expiry_date": "string or NA",
  "Policy_issuance_date": "string or NA"
}

RULES:
1. Return ONLY the JSON object, with no additional text and no markdown fences
2. If a field is not found, use "NA" (never null, never an empty string)
3. Policyholder = the customer who bought the policy; Intermediary = the agent/broker/POS who sold it
4. Total_premium_paid = final amount including all taxes/GST; Base_premium = premium before taxes
5. All dates must be in DD/MM/YYYY format"#;

/// Instruction wrapped around the sampled document text.
const USER_INSTRUCTION: &str = "Extract policy data from this text:";

/// Instruction sent with a rendered page image in vision mode.
pub const VISION_USER_INSTRUCTION: &str =
    "Extract policy data from this page image. Return the JSON object only.";

/// A system/user prompt pair ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Build the extraction prompts for `document_text`.
pub fn build_prompt(document_text: &str) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{USER_INSTRUCTION}\n\n{document_text}"),
    }
}

/// Build the prompts for one rendered page in vision mode.
pub fn build_vision_prompt() -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user: VISION_USER_INSTRUCTION.to_string(),
    }
}
