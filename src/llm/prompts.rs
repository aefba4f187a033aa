use serde_json::{Value, json};

use crate::llm::ToolSpec;
use crate::models::{FirmRecord, SearchFields, TARGET_FIELDS};

/// System prompt shared by the single-record and batch calls
pub const SYSTEM_PROMPT: &str = "You are a precise B2B data enricher for construction and \
infrastructure firms. Infer and complete missing fields ONLY from trusted public context. \
Return STRICT JSON with the specified schema. Use null when unknown.";

pub const PROFILE_TOOL_NAME: &str = "submit_company_profile";

/// Build the user prompt for enriching one firm
pub fn build_record_prompt(base: &FirmRecord, search: &SearchFields) -> String {
    let payload = json!({
        "base": base,
        "search": search,
        "required_fields": TARGET_FIELDS,
        "instructions": "Fill missing fields from reliable public data. Provide contact arrays as specified.",
    });

    format!(
        "Return only JSON matching this schema (no commentary).\n{}",
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
    )
}

/// Build the user prompt for enriching a chunk of firms in one call
pub fn build_batch_prompt(chunk: &[FirmRecord]) -> String {
    let payload = json!({
        "instructions": "Fill missing fields for each firm. Return a JSON array with one object \
            per input record, in the same order. Copy each record's sequence and firm into its \
            object unchanged. Use null when unknown.",
        "required_fields": TARGET_FIELDS,
        "records": chunk,
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
}

/// System prompt for model-judged lead scoring
pub const SCORING_SYSTEM_PROMPT: &str = "You are a precise JSON-only scoring assistant.";

/// Build the user prompt for scoring a batch of enriched firms as leads for
/// water-saving valve products
pub fn build_scoring_prompt(batch: &[FirmRecord]) -> String {
    let leads: Vec<Value> = batch
        .iter()
        .map(|record| {
            let profile = &record.profile;
            json!({
                "sequence": record.sequence,
                "firm": record.firm,
                "industry": profile.industry,
                "country": profile.country,
                "location": record.location,
                "operating_regions": profile.operating_regions,
                "description": profile.description,
                "total_revenue_m": record.total_revenue,
                "contact_email": profile.contact_email,
                "contact_phone": profile.contact_phone,
                "linkedin": profile.linkedin_url.iter().map(|l| l.url.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();

    format!(
        "Score each company below as a buyer of smart water valves that cut water use. \
Judge only from the data given and general knowledge.\n\n\
Return ONLY a JSON array with one object per company: sequence, lead_score, \
completeness_score, relevance_score. No other fields or text.\n\n\
- lead_score: integer 0-100. Industry fit (construction, infrastructure, water, hospitals): \
up to 40. Water or infrastructure terms in the description (water, sewer, pipeline, \
wastewater): up to 30. Revenue size: up to 15. Regional fit such as North America: up to 10. \
Usable contact details: up to 5.\n\
- completeness_score: number 0.0-1.0 for how rich the fields and contacts are.\n\
- relevance_score: number 0.0-1.0 for how well the company fits as a buyer.\n\n\
Leads:\n{}",
        serde_json::to_string(&leads).unwrap_or_else(|_| "[]".to_string())
    )
}

/// Structured-output tool listing the target fields
pub fn profile_tool() -> ToolSpec {
    let text = |description: &str| json!({"type": ["string", "null"], "description": description});

    let mut properties = serde_json::Map::new();
    for field in TARGET_FIELDS {
        let schema: Value = match field {
            "founded_year" => json!({"type": ["integer", "null"], "description": "Year the company was founded"}),
            "linkedin_url" => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "owner": {"type": "string"},
                        "url": {"type": "string"}
                    },
                    "required": ["owner", "url"]
                }
            }),
            "related_contacts" => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": ["string", "null"]},
                        "designation": {"type": ["string", "null"]},
                        "email": {"type": ["string", "null"]},
                        "phone": {"type": ["string", "null"]}
                    }
                }
            }),
            "operating_regions" => text("Where the company operates, e.g. Global or North America"),
            other => text(&other.replace('_', " ")),
        };
        properties.insert(field.to_string(), schema);
    }

    ToolSpec {
        name: PROFILE_TOOL_NAME.to_string(),
        description: "Submit the company profile. Use null for anything not publicly known."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": TARGET_FIELDS,
        }),
    }
}
