//! Fixed extraction prompt for incoming medical faxes.

/// System message sent ahead of every extraction prompt.
pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant for medical document extraction.";

/// Fax classifications the model must choose from.
pub const FAX_TYPES: &[&str] = &[
    "CPAP Order",
    "Chart Notes",
    "Hospital Bed Request",
    "Billing",
    "Prescription",
    "Referral",
    "Lab Results",
    "Other / Unknown",
];

const INSTRUCTIONS: &str = r#"
You are a highly intelligent medical document AI assistant.

Your job is to:
1. **Classify the type of fax** (choose one):
{fax_types}

2. **Extract all relevant structured data** from the fax text and populate the JSON below. Be very flexible in interpreting field labels, e.g.:
   - DOB = "Date of Birth", "Birthdate", "DOB",etc.
   - Sex = "Gender"
   - Doctor = "Physician", "Provider"
   - Phone = "Contact", "Tel", etc.
   - Address fields = "Ship To", "To Address", "Delivery", "Home", "Permanent", etc.
   - Diagnosis Codes = "Dx", "ICD-10"
   - Procedure Codes = "CPT", "HCPCS"
   - E-signature fields = "Signed by", "Dr. Signature", etc.

3. Populate the `fax_metadata.total_pages` field based on content hints (e.g., "Page 1 of 10").

4. If a field isn't present, use empty string (`""`) or an empty list (`[]`), but always keep all keys.

**Instructions:**
- Output ONLY the JSON object, no markdown, no comments.
- Follow the format exactly.
- Make sure lists are properly formed.
- Prioritize clean and complete structured data extraction.

---

Output Format:
"#;

const OUTPUT_SCHEMA: &str = r#"
{
  "ordered_service": {
    "service_name": ""
  },
  "type_of_fax": "<classified_type_here>",
  "demographics": {
    "first_name": "", "last_name": "", "middle_name": "", "DOB": "",
    "gender": "", "ethnicity": "", "language": "", "height": "", "weight": ""
  },
  "contact": {
    "phone": "", "mobile": "", "emergency_contact": "", "emergency_contact_relationship": "",
    "email": "", "residential_address_line_1": "", "residential_address_line_2": "",
    "residential_address_city": "", "residential_address_state": "", "residential_address_zip_code": "",
    "residential_address_country": "", "residential_address_full_address": "",
    "delivery_address_line_1": "", "delivery_address_line_2": "", "delivery_address_city": "",
    "delivery_address_state": "", "delivery_address_zip_code": "", "delivery_address_country": "",
    "delivery_address_full_address": ""
  },
  "insurance": {
    "insurance_carrier": "", "insurance_id": "", "group_id": "", "coverage_start": "",
    "insurance_plan_name": "", "secondary_carrier": "", "secondary_insurance_id": "",
    "secondary_group_id": ""
  },
  "clinical_details": {
    "diagnosis_codes": "", "ordering_provider": "", "NPI": "", "provider_address": "", "facility": "",
    "procedure_codes": "", "ordering_provider_phone_number": "",
    "ordering_provider_fax": "", "referring_md": "", "e_signature": "", "e_signature_date": ""
  },
  "medical_information_extracted": {
    "vitals": ["<Always an array of strings like 'No alcohol use', 'Caffeine use: Yes'>"], "assessments": [], "medications": [],
    "medical_history": [], "presenting_symptoms": [], "social_history": []
  },
  "procedure_codes": [
    {
      "code": "", "quantity": "", "length_of_need": "",
      "product_name": "", "frequency": ""
    }
  ],
  "e_signature": [
    {
      "signature": "", "service_date": "", "signature_date": ""
    }
  ],
  "clinical_details_expanded": {
    "ordering_provider_first_name": "", "ordering_provider_last_name": "",
    "ordering_provider_name": "", "NPI": "", "provider_address_line_1": "",
    "provider_address_line_2": "", "provider_address_city": "", "provider_address_state": "",
    "provider_address_zip_code": "", "provider_address_country": "", "provider_address_full_address": "",
    "facility": "", "diagnosis_codes": "", "procedure_codes": "",
    "ordering_provider_phone_number": "", "ordering_provider_fax": "", "referring_md": ""
  },
  "fax_metadata": {
    "total_pages": ""
  }
}
"#;

/// Prompt asking the model to classify the fax and fill the extraction
/// schema from `extracted_text`.
pub fn build_medical_prompt(extracted_text: &str) -> String {
    let fax_types = FAX_TYPES
        .iter()
        .map(|t| format!("   - \"{t}\""))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}{}\n---\n\nFax Text:\n\"\"\"\n{extracted_text}\n\"\"\"\n\nONLY return the JSON.\n",
        INSTRUCTIONS.replace("{fax_types}", &fax_types),
        OUTPUT_SCHEMA,
    )
}

/// Pull the JSON object out of a model reply, tolerating markdown fences and
/// chatter around it. Returns `None` when no object parses.
pub fn parse_model_reply(reply: &str) -> Option<serde_json::Value> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&reply[start..=end])
        .ok()
        .filter(serde_json::Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_and_schema() {
        let prompt = build_medical_prompt("DOB: 01/02/1960");
        assert!(prompt.contains("\"\"\"\nDOB: 01/02/1960\n\"\"\""));
        assert!(prompt.contains("\"type_of_fax\": \"<classified_type_here>\""));
        assert!(prompt.contains("   - \"Hospital Bed Request\""));
        assert!(prompt.trim_end().ends_with("ONLY return the JSON."));
    }

    #[test]
    fn schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(OUTPUT_SCHEMA).unwrap();
        assert!(schema["demographics"]["DOB"].is_string());
        assert!(schema["procedure_codes"].is_array());
    }

    #[test]
    fn reply_parsing_strips_fences() {
        let reply = "```json\n{\"type_of_fax\": \"Referral\"}\n```";
        let value = parse_model_reply(reply).unwrap();
        assert_eq!(value["type_of_fax"], "Referral");
    }

    #[test]
    fn reply_without_object_is_none() {
        assert!(parse_model_reply("I could not read this fax.").is_none());
        assert!(parse_model_reply("} oops {").is_none());
        assert!(parse_model_reply("{not json}").is_none());
    }
}
