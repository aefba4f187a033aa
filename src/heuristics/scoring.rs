use crate::models::{CompanyProfile, LeadScores, TARGET_FIELDS};

pub const WATER_KEYWORDS: [&str; 4] = ["water", "wastewater", "water supply", "sewer"];
pub const INFRA_KEYWORDS: [&str; 4] = ["infrastructure", "transportation", "power", "industrial"];

/// Points per matched keyword; four matches saturate at 100
const KEYWORD_WEIGHT: usize = 25;

/// Score a profile for sales-lead relevance.
///
/// Pure function of the target fields: completeness is the share of filled
/// target fields, focus scores count keyword hits in description + industry,
/// and the lead score blends them 40/40/20.
pub fn score_profile(profile: &CompanyProfile) -> LeadScores {
    let data_completeness_score = completeness(profile);

    let text = format!(
        "{} {}",
        profile.description.as_deref().unwrap_or(""),
        profile.industry.as_deref().unwrap_or("")
    )
    .to_lowercase();
    let water_focus_score = focus(&text, &WATER_KEYWORDS);
    let infra_focus_score = focus(&text, &INFRA_KEYWORDS);

    let weighted = 4 * u32::from(water_focus_score)
        + 4 * u32::from(infra_focus_score)
        + 2 * u32::from(data_completeness_score);
    let lead_score = (weighted / 10) as u8;

    LeadScores {
        water_focus_score,
        infra_focus_score,
        lead_score,
        data_completeness_score,
    }
}

fn completeness(profile: &CompanyProfile) -> u8 {
    let filled = profile.filled_count() as f64;
    (100.0 * filled / TARGET_FIELDS.len() as f64).round() as u8
}

fn focus(text: &str, keywords: &[&str]) -> u8 {
    let hits = keywords.iter().filter(|k| text.contains(*k)).count();
    (KEYWORD_WEIGHT * hits).min(100) as u8
}
