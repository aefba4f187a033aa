use std::cmp::Ordering;

use clap::ValueEnum;

use crate::models::FirmRecord;

/// Sort order for the record browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    /// Highest lead score first
    #[default]
    Lead,
    /// Highest total revenue first
    Revenue,
    /// Current rank, ascending
    Rank,
    /// Most complete profiles first
    Completeness,
}

/// Filters and ordering applied before rendering
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Exact country match, case-insensitive
    pub country: Option<String>,
    pub min_lead_score: Option<u8>,
    /// Substring of the firm name, case-insensitive
    pub search: Option<String>,
    pub sort: SortKey,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn matches(&self, record: &FirmRecord) -> bool {
        if let Some(country) = &self.country {
            let matched = record
                .profile
                .country
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(country));
            if !matched {
                return false;
            }
        }
        if let Some(min) = self.min_lead_score {
            if record.lead_score.unwrap_or(0) < min {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            if !record.firm.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Filter, sort and truncate
    pub fn apply<'a>(&self, records: &'a [FirmRecord]) -> Vec<&'a FirmRecord> {
        let mut selected: Vec<&FirmRecord> = records.iter().filter(|r| self.matches(r)).collect();
        selected.sort_by(|a, b| compare(self.sort, a, b));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn compare(key: SortKey, a: &FirmRecord, b: &FirmRecord) -> Ordering {
    let descending = |x: Option<f64>, y: Option<f64>| {
        y.unwrap_or(f64::NEG_INFINITY)
            .total_cmp(&x.unwrap_or(f64::NEG_INFINITY))
    };
    let primary = match key {
        SortKey::Lead => b.lead_score.cmp(&a.lead_score),
        SortKey::Revenue => descending(a.total_revenue, b.total_revenue),
        SortKey::Rank => a
            .rank_current
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.rank_current.unwrap_or(f64::INFINITY)),
        SortKey::Completeness => b.data_completeness_score.cmp(&a.data_completeness_score),
    };
    primary.then(a.sequence.cmp(&b.sequence))
}

/// Render the summary table shown by `inspect`
pub fn render_summary(records: &[&FirmRecord]) -> String {
    let mut output = format!(
        "{:>4}  {:>5}  {:<40}  {:<16}  {:>10}  {:>4}  {:>5}  {:>5}  {:>4}\n",
        "#", "Rank", "Firm", "Country", "Revenue", "Lead", "Water", "Infra", "Data"
    );
    output.push_str(&"-".repeat(output.trim_end().len()));
    output.push('\n');

    for record in records {
        output.push_str(&format!(
            "{:>4}  {:>5}  {:<40}  {:<16}  {:>10}  {:>4}  {:>5}  {:>5}  {:>4}\n",
            record.sequence,
            format_number(record.rank_current),
            truncate(&record.firm, 40),
            truncate(record.profile.country.as_deref().unwrap_or("-"), 16),
            format_number(record.total_revenue),
            format_score(record.lead_score),
            format_score(record.water_focus_score),
            format_score(record.infra_focus_score),
            format_score(record.data_completeness_score),
        ));
    }

    output.push_str(&format!("\n{} records\n", records.len()));
    output
}

/// Render every field of one record
pub fn render_detail(record: &FirmRecord) -> String {
    let mut output = format!("#{} {}\n\n", record.sequence, record.firm);

    let line = |label: &str, value: String| format!("  {:<22} {}\n", label, value);
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    output.push_str("Table\n");
    output.push_str(&line("Rank (current/prior)", format!(
        "{} / {}",
        format_number(record.rank_current),
        format_number(record.rank_prior)
    )));
    output.push_str(&line("Location", text(&record.location)));
    output.push_str(&line("Total revenue ($M)", format_number(record.total_revenue)));
    output.push_str(&line("Intl revenue ($M)", format_number(record.intl_revenue)));
    output.push_str(&line("New contracts ($M)", format_number(record.new_contracts)));

    let segments = &record.segments;
    for (label, value) in [
        ("General building %", segments.general_building_pct),
        ("Manufacturing %", segments.manufacturing_pct),
        ("Power %", segments.power_pct),
        ("Water supply %", segments.water_supply_pct),
        ("Sewer/waste %", segments.sewer_waste_pct),
        ("Industrial/oil-gas %", segments.industrial_oilgas_pct),
        ("Transportation %", segments.transportation_pct),
        ("Hazardous waste %", segments.hazardous_waste_pct),
        ("Telecom %", segments.telecom_pct),
    ] {
        output.push_str(&line(label, format_number(value)));
    }

    let profile = &record.profile;
    output.push_str("\nProfile\n");
    output.push_str(&line("Industry", text(&profile.industry)));
    output.push_str(&line(
        "Founded",
        profile
            .founded_year
            .map_or_else(|| "-".to_string(), |y| y.to_string()),
    ));
    output.push_str(&line("Headquarters", text(&profile.headquarters)));
    output.push_str(&line("Country", text(&profile.country)));
    output.push_str(&line("Website", text(&profile.website)));
    output.push_str(&line("Employees", text(&profile.employee_count)));
    output.push_str(&line("Annual turnover", text(&profile.annual_turnover)));
    output.push_str(&line("Operating regions", text(&profile.operating_regions)));
    output.push_str(&line("Description", text(&profile.description)));

    output.push_str("\nContact\n");
    output.push_str(&line("Name", text(&profile.contact_name)));
    output.push_str(&line("Designation", text(&profile.contact_designation)));
    output.push_str(&line("Email", text(&profile.contact_email)));
    output.push_str(&line("Phone", text(&profile.contact_phone)));
    for link in &profile.linkedin_url {
        output.push_str(&line("LinkedIn", format!("{} ({})", link.url, link.owner)));
    }
    for contact in &profile.related_contacts {
        output.push_str(&line(
            "Related",
            format!(
                "{}, {}",
                text(&contact.name),
                text(&contact.designation)
            ),
        ));
    }

    output.push_str("\nScores\n");
    output.push_str(&line("Lead", format_score(record.lead_score)));
    output.push_str(&line("Water focus", format_score(record.water_focus_score)));
    output.push_str(&line("Infra focus", format_score(record.infra_focus_score)));
    output.push_str(&line("Data completeness", format_score(record.data_completeness_score)));

    output
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.1}", v),
        None => "-".to_string(),
    }
}

fn format_score(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
