use std::sync::LazyLock;

use regex::Regex;

static HEADQUARTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:headquartered|based)\s+in\s+([a-z][a-z.\-]*(?:\s+[a-z][a-z.\-]*){0,3}),\s*([a-z][a-z.\-]*(?:\s+[a-z][a-z.\-]*){0,3})",
    )
    .expect("valid regex")
});

/// Words that end a region name when a snippet runs on without punctuation
const REGION_STOPWORDS: [&str; 16] = [
    "and", "or", "since", "with", "that", "which", "where", "is", "was", "has", "in", "for",
    "the", "to", "of", "serving",
];

static GLOBAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)global|worldwide|international").expect("valid regex"));
static NORTH_AMERICA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)North America|USA|United States|Canada|Mexico").expect("valid regex")
});

/// Extract a `City, Region` headquarters string from search snippet text.
///
/// Matching is case-insensitive; the region stops at the first connective
/// word, so "based in omaha, nebraska and builds" yields "omaha, nebraska".
pub fn extract_headquarters(text: &str) -> Option<String> {
    let captures = HEADQUARTERS.captures(text)?;
    let city = captures.get(1)?.as_str().trim();
    let region: Vec<&str> = captures
        .get(2)?
        .as_str()
        .split_whitespace()
        .take_while(|word| !REGION_STOPWORDS.contains(&word.to_lowercase().as_str()))
        .collect();
    if region.is_empty() {
        return None;
    }
    Some(format!("{}, {}", city, region.join(" ")))
}

/// Label the operating footprint described by snippet text
pub fn detect_operating_regions(text: &str) -> Option<String> {
    if GLOBAL.is_match(text) {
        Some("Global".to_string())
    } else if NORTH_AMERICA.is_match(text) {
        Some("North America".to_string())
    } else {
        None
    }
}
