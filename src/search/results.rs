use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Hosts that aggregate or profile companies rather than being their website
pub const DENIED_WEBSITE_HOSTS: [&str; 6] = [
    "linkedin",
    "wikipedia",
    "bloomberg",
    "crunchbase",
    "indeed",
    "glassdoor",
];

/// Maximum length of the description snippet, in characters
pub const MAX_SNIPPET_CHARS: usize = 500;

static COMPANY_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[\w.\-]*linkedin\.com/company/[\w\-/]+").expect("valid regex")
});

/// What we keep from one search results page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Target of the first organic result
    pub first_url: Option<String>,
    /// Company social profile link, if any result points at one
    pub company_profile: Option<String>,
    /// Result titles and descriptions, tag-free and truncated
    pub snippet: String,
    /// Number of organic results on the page
    pub result_count: usize,
}

impl SearchPage {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let result_links = selector("a.result__a");
        let result_snippets = selector(".result__snippet");
        let any_link = selector("a[href]");

        let results: Vec<_> = document.select(&result_links).collect();

        let first_url = results
            .first()
            .and_then(|a| a.value().attr("href"))
            .map(unwrap_redirect);

        let mut fragments: Vec<String> = results.iter().map(|a| a.text().collect::<Vec<_>>().join(" ")).collect();
        fragments.extend(
            document
                .select(&result_snippets)
                .map(|s| s.text().collect::<Vec<_>>().join(" ")),
        );
        let snippet = truncate_chars(&collapse_whitespace(&fragments.join(" ")), MAX_SNIPPET_CHARS);

        let company_profile = document
            .select(&any_link)
            .filter_map(|a| a.value().attr("href"))
            .map(unwrap_redirect)
            .find_map(|href| COMPANY_PROFILE.find(&href).map(|m| m.as_str().to_string()))
            .or_else(|| COMPANY_PROFILE.find(html).map(|m| m.as_str().to_string()));

        Self {
            first_url,
            company_profile,
            snippet,
            result_count: results.len(),
        }
    }

    /// The first result, unless it points at an aggregator or social site
    pub fn website_candidate(&self) -> Option<&str> {
        self.first_url.as_deref().filter(|url| !is_denied_website(url))
    }
}

/// Resolve `/l/?uddg=<target>` redirect links to their target
pub fn unwrap_redirect(href: &str) -> String {
    if !href.contains("uddg=") {
        return href.to_string();
    }
    Url::parse("https://duckduckgo.com")
        .and_then(|base| base.join(href))
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or_else(|| href.to_string())
}

/// Whether a URL's host is on the website denylist
pub fn is_denied_website(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| url.to_lowercase());
    DENIED_WEBSITE_HOSTS.iter().any(|denied| host.contains(denied))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
