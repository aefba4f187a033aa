use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fields the language-model stage is responsible for filling, in the
/// order they are requested and scored.
pub const TARGET_FIELDS: [&str; 15] = [
    "industry",
    "founded_year",
    "headquarters",
    "country",
    "website",
    "employee_count",
    "annual_turnover",
    "description",
    "operating_regions",
    "contact_name",
    "contact_designation",
    "contact_email",
    "contact_phone",
    "linkedin_url",
    "related_contacts",
];

/// One firm's row, created by table normalization and filled in by each
/// later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmRecord {
    /// 1-based position in the normalized table
    pub sequence: usize,
    pub rank_current: Option<f64>,
    pub rank_prior: Option<f64>,
    pub firm: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Total revenue in $ millions
    pub total_revenue: Option<f64>,
    /// International revenue in $ millions
    pub intl_revenue: Option<f64>,
    /// New contracts in $ millions
    pub new_contracts: Option<f64>,
    #[serde(flatten)]
    pub segments: SegmentShares,
    #[serde(flatten)]
    pub profile: CompanyProfile,
    #[serde(default)]
    pub water_focus_score: Option<u8>,
    #[serde(default)]
    pub infra_focus_score: Option<u8>,
    #[serde(default)]
    pub lead_score: Option<u8>,
    #[serde(default)]
    pub data_completeness_score: Option<u8>,
    /// Model-judged lead score, kept apart from the deterministic one
    #[serde(default)]
    pub llm_lead_score: Option<u8>,
    /// Model-judged field richness, 0.0-1.0
    #[serde(default)]
    pub llm_completeness_score: Option<f64>,
    /// Model-judged fit as a buyer, 0.0-1.0
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

impl FirmRecord {
    pub fn new(sequence: usize, firm: impl Into<String>) -> Self {
        Self {
            sequence,
            rank_current: None,
            rank_prior: None,
            firm: firm.into(),
            location: None,
            total_revenue: None,
            intl_revenue: None,
            new_contracts: None,
            segments: SegmentShares::default(),
            profile: CompanyProfile::default(),
            water_focus_score: None,
            infra_focus_score: None,
            lead_score: None,
            data_completeness_score: None,
            llm_lead_score: None,
            llm_completeness_score: None,
            relevance_score: None,
        }
    }

    /// Overwrite the search-derived fields with a fresh lookup result
    pub fn apply_search(&mut self, fields: &SearchFields) {
        self.profile.website = fields.website.clone();
        self.profile.headquarters = fields.headquarters.clone();
        self.profile.country = fields.country.clone();
        self.profile.description = fields.description.clone();
        self.profile.operating_regions = fields.operating_regions.clone();
        self.profile.linkedin_url = fields.linkedin_url.clone();
    }

    /// The search-derived subset of the current profile
    pub fn search_fields(&self) -> SearchFields {
        SearchFields {
            website: self.profile.website.clone(),
            headquarters: self.profile.headquarters.clone(),
            country: self.profile.country.clone(),
            description: self.profile.description.clone(),
            operating_regions: self.profile.operating_regions.clone(),
            linkedin_url: self.profile.linkedin_url.clone(),
        }
    }

    pub fn apply_scores(&mut self, scores: &LeadScores) {
        self.water_focus_score = Some(scores.water_focus_score);
        self.infra_focus_score = Some(scores.infra_focus_score);
        self.lead_score = Some(scores.lead_score);
        self.data_completeness_score = Some(scores.data_completeness_score);
    }

    pub fn scores(&self) -> Option<LeadScores> {
        Some(LeadScores {
            water_focus_score: self.water_focus_score?,
            infra_focus_score: self.infra_focus_score?,
            lead_score: self.lead_score?,
            data_completeness_score: self.data_completeness_score?,
        })
    }
}

/// Percentage of business by market segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentShares {
    pub general_building_pct: Option<f64>,
    pub manufacturing_pct: Option<f64>,
    pub power_pct: Option<f64>,
    pub water_supply_pct: Option<f64>,
    pub sewer_waste_pct: Option<f64>,
    pub industrial_oilgas_pct: Option<f64>,
    pub transportation_pct: Option<f64>,
    pub hazardous_waste_pct: Option<f64>,
    pub telecom_pct: Option<f64>,
}

/// A company social profile link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInProfile {
    /// Who the profile belongs to (the firm or a named contact)
    pub owner: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedContact {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The 15 target fields filled by search and language-model enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub founded_year: Option<u32>,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub employee_count: Option<String>,
    #[serde(default)]
    pub annual_turnover: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub operating_regions: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_designation: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Vec<LinkedInProfile>,
    #[serde(default)]
    pub related_contacts: Vec<RelatedContact>,
}

impl CompanyProfile {
    /// Copy the fields a search lookup can provide; the rest stay null
    pub fn from_search(fields: &SearchFields) -> Self {
        Self {
            website: fields.website.clone(),
            headquarters: fields.headquarters.clone(),
            country: fields.country.clone(),
            description: fields.description.clone(),
            operating_regions: fields.operating_regions.clone(),
            linkedin_url: fields.linkedin_url.clone(),
            ..Default::default()
        }
    }

    /// Build a profile from a model's JSON object.
    ///
    /// Only target keys are read. Values are coerced to the field type where
    /// possible and become null otherwise.
    pub fn from_model_value(value: &Value, firm: &str) -> Self {
        let field = |key: &str| value.get(key).unwrap_or(&Value::Null);
        Self {
            industry: coerce_string(field("industry")),
            founded_year: coerce_year(field("founded_year")),
            headquarters: coerce_string(field("headquarters")),
            country: coerce_string(field("country")),
            website: coerce_string(field("website")),
            employee_count: coerce_string(field("employee_count")),
            annual_turnover: coerce_string(field("annual_turnover")),
            description: coerce_string(field("description")),
            operating_regions: coerce_string(field("operating_regions")),
            contact_name: coerce_string(field("contact_name")),
            contact_designation: coerce_string(field("contact_designation")),
            contact_email: coerce_string(field("contact_email")),
            contact_phone: coerce_string(field("contact_phone")),
            linkedin_url: coerce_profiles(field("linkedin_url"), firm),
            related_contacts: coerce_contacts(field("related_contacts")),
        }
    }

    /// Take every filled field from `other`, keeping ours where `other` is empty
    pub fn merge_filled(&mut self, other: CompanyProfile) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.industry, other.industry);
        take(&mut self.founded_year, other.founded_year);
        take(&mut self.headquarters, other.headquarters);
        take(&mut self.country, other.country);
        take(&mut self.website, other.website);
        take(&mut self.employee_count, other.employee_count);
        take(&mut self.annual_turnover, other.annual_turnover);
        take(&mut self.description, other.description);
        take(&mut self.operating_regions, other.operating_regions);
        take(&mut self.contact_name, other.contact_name);
        take(&mut self.contact_designation, other.contact_designation);
        take(&mut self.contact_email, other.contact_email);
        take(&mut self.contact_phone, other.contact_phone);
        if !other.linkedin_url.is_empty() {
            self.linkedin_url = other.linkedin_url;
        }
        if !other.related_contacts.is_empty() {
            self.related_contacts = other.related_contacts;
        }
    }

    /// Number of target fields holding a non-null, non-empty value
    pub fn filled_count(&self) -> usize {
        let text = [
            &self.industry,
            &self.headquarters,
            &self.country,
            &self.website,
            &self.employee_count,
            &self.annual_turnover,
            &self.description,
            &self.operating_regions,
            &self.contact_name,
            &self.contact_designation,
            &self.contact_email,
            &self.contact_phone,
        ];
        text.iter()
            .filter(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
            .count()
            + usize::from(self.founded_year.is_some())
            + usize::from(!self.linkedin_url.is_empty())
            + usize::from(!self.related_contacts.is_empty())
    }
}

/// Partial company facts from a web search lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFields {
    pub website: Option<String>,
    pub headquarters: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub operating_regions: Option<String>,
    #[serde(default)]
    pub linkedin_url: Vec<LinkedInProfile>,
}

/// Heuristic lead scores, all in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScores {
    pub water_focus_score: u8,
    pub infra_focus_score: u8,
    pub lead_score: u8,
    pub data_completeness_score: u8,
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(coerce_string).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn coerce_year(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|y| u32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_profiles(value: &Value, firm: &str) -> Vec<LinkedInProfile> {
    match value {
        Value::String(_) => coerce_string(value)
            .map(|url| LinkedInProfile {
                owner: firm.to_string(),
                url,
            })
            .into_iter()
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(_) => {
                    let url = ["url", "linkedin_url"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(coerce_string))?;
                    let owner = ["owner", "belongs_to", "contact_name", "name"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(coerce_string))
                        .unwrap_or_else(|| firm.to_string());
                    Some(LinkedInProfile { owner, url })
                }
                _ => coerce_string(item).map(|url| LinkedInProfile {
                    owner: firm.to_string(),
                    url,
                }),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_contacts(value: &Value) -> Vec<RelatedContact> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let pick = |keys: &[&str]| keys.iter().find_map(|k| item.get(*k).and_then(coerce_string));
            let contact = match item {
                Value::Object(_) => RelatedContact {
                    name: pick(&["name", "contact_name"]),
                    designation: pick(&["designation", "position", "title"]),
                    email: pick(&["email"]),
                    phone: pick(&["phone"]),
                },
                _ => RelatedContact {
                    name: coerce_string(item),
                    ..Default::default()
                },
            };
            (contact != RelatedContact::default()).then_some(contact)
        })
        .collect()
}
