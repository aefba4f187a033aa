use std::sync::LazyLock;

use regex::Regex;

static UNITED_STATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),\s*(?:USA|United States|U\.S\.|US)(?:[^A-Za-z]|$)").expect("valid regex")
});
static CANADA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCanada\b").expect("valid regex"));
static UNITED_KINGDOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bUK\b|United Kingdom|England|Scotland|Wales").expect("valid regex")
});
static INDIA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bIndia\b").expect("valid regex"));

/// Guess a country from free-form location text.
///
/// Recognizes a handful of countries by keyword; otherwise the last
/// comma-separated token is taken when it is longer than a state code.
pub fn guess_country(location: Option<&str>) -> Option<String> {
    let location = location?.trim();
    if location.is_empty() {
        return None;
    }

    if UNITED_STATES.is_match(location) {
        return Some("United States".to_string());
    }
    if CANADA.is_match(location) {
        return Some("Canada".to_string());
    }
    if UNITED_KINGDOM.is_match(location) {
        return Some("United Kingdom".to_string());
    }
    if INDIA.is_match(location) {
        return Some("India".to_string());
    }

    let parts: Vec<&str> = location.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [_, .., last] if last.chars().count() > 2 => Some(last.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_countries() {
        assert_eq!(guess_country(Some("Dallas, Texas, USA")).as_deref(), Some("United States"));
        assert_eq!(guess_country(Some("Boston, U.S.")).as_deref(), Some("United States"));
        assert_eq!(guess_country(Some("Toronto, Ontario, Canada")).as_deref(), Some("Canada"));
        assert_eq!(guess_country(Some("Leeds, England")).as_deref(), Some("United Kingdom"));
        assert_eq!(guess_country(Some("Pune, India")).as_deref(), Some("India"));
    }

    #[test]
    fn test_trailing_token_fallback() {
        assert_eq!(guess_country(Some("Sydney, Australia")).as_deref(), Some("Australia"));
        // state codes are too short to be a country
        assert_eq!(guess_country(Some("Omaha, NE")), None);
        assert_eq!(guess_country(Some("Springfield")), None);
    }

    #[test]
    fn test_missing_location() {
        assert_eq!(guess_country(None), None);
        assert_eq!(guess_country(Some("  ")), None);
    }

    #[test]
    fn test_us_requires_standalone_token() {
        // "Usher" must not read as "US"
        assert_eq!(guess_country(Some("Columbia, Usher")).as_deref(), Some("Usher"));
    }
}
