use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::heuristics::{detect_operating_regions, extract_headquarters, guess_country};
use crate::models::{FirmRecord, LinkedInProfile, Outcome, SearchFields};
use crate::search::{SearchBackend, SearchPage};

/// Configuration for the search enrichment stage
#[derive(Debug, Clone)]
pub struct SearchStageConfig {
    /// Records per logged chunk
    pub batch_size: usize,
    /// Pause between consecutive lookups
    pub delay: Duration,
}

impl Default for SearchStageConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            delay: Duration::from_millis(400),
        }
    }
}

/// Result of the search enrichment stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStageReport {
    pub chunks: usize,
    pub records_enriched: usize,
    pub records_degraded: usize,
}

/// Look up one firm and derive partial company facts.
///
/// Searches `"<firm> company"`, then the bare firm name. If neither query
/// returns a page, only the location-based country guess is filled in.
pub async fn enrich_company(
    client: &dyn SearchBackend,
    firm: &str,
    location: Option<&str>,
) -> Outcome<SearchFields> {
    let mut fields = SearchFields::default();

    let html = match client.fetch(&format!("{firm} company")).await {
        Some(html) => Some(html),
        None => client.fetch(firm).await,
    };

    let Some(html) = html else {
        info!("No search results for {}; using heuristics only", firm);
        fields.country = guess_country(location);
        return Outcome::degraded(fields, "search results unavailable");
    };

    let page = SearchPage::parse(&html);

    fields.website = page.website_candidate().map(str::to_string);
    fields.linkedin_url = page
        .company_profile
        .iter()
        .map(|url| LinkedInProfile {
            owner: firm.to_string(),
            url: url.clone(),
        })
        .collect();
    if !page.snippet.is_empty() {
        fields.description = Some(page.snippet.clone());
    }
    fields.headquarters = extract_headquarters(&page.snippet);
    fields.operating_regions = detect_operating_regions(&page.snippet);
    fields.country = guess_country(location);

    if page.result_count == 0 {
        return Outcome::degraded(fields, "search page had no results");
    }
    Outcome::Enriched(fields)
}

/// Execute the search enrichment stage over all records, in place.
///
/// Lookups run one at a time with a fixed pause between them. A failed
/// lookup only degrades that record.
pub async fn execute_search_stage(
    client: &dyn SearchBackend,
    records: &mut [FirmRecord],
    config: &SearchStageConfig,
) -> SearchStageReport {
    let mut report = SearchStageReport::default();
    let total = records.len();
    if total == 0 {
        return report;
    }

    let batch_size = config.batch_size.max(1);
    info!(
        "Search: enriching {} records (chunk size={})",
        total, batch_size
    );

    let mut first = true;
    for (chunk_index, chunk) in records.chunks_mut(batch_size).enumerate() {
        let start = chunk_index * batch_size;
        report.chunks += 1;
        info!(
            "Search: processing chunk {}-{}/{}",
            start + 1,
            start + chunk.len(),
            total
        );

        for record in chunk.iter_mut() {
            if !first && !config.delay.is_zero() {
                tokio::time::sleep(config.delay).await;
            }
            first = false;

            let outcome = enrich_company(client, &record.firm, record.location.as_deref()).await;
            match &outcome {
                Outcome::Enriched(_) => report.records_enriched += 1,
                Outcome::Degraded { reason, .. } => {
                    debug!("Search degraded for {}: {}", record.firm, reason);
                    report.records_degraded += 1;
                }
            }
            record.apply_search(outcome.value());
            debug!("Search: processed #{} {}", record.sequence, record.firm);
        }
    }

    info!(
        "Search: {} enriched, {} degraded",
        report.records_enriched, report.records_degraded
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchClient, SearchConfig};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;
    use wiremock::matchers::query_param;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.acme.example%2F">Acme Co</a>
        <a class="result__snippet">Acme Co is based in Omaha, Nebraska and builds water and power plants across the United States.</a>
        <a class="result__a" href="https://www.linkedin.com/company/acme">Acme | LinkedIn</a>
    </body></html>"#;

    fn client_for(server: &MockServer) -> SearchClient {
        SearchClient::new(SearchConfig {
            endpoint: format!("{}/html/", server.uri()),
            ..Default::default()
        })
        .unwrap()
    }

    fn no_delay() -> SearchStageConfig {
        SearchStageConfig {
            batch_size: 1,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_enrich_company_from_page() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "Acme Co company"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let outcome = enrich_company(&client_for(&server), "Acme Co", Some("Omaha, NE, USA")).await;

        assert!(outcome.is_enriched());
        let fields = outcome.into_value();
        assert_eq!(fields.website.as_deref(), Some("https://www.acme.example/"));
        assert_eq!(fields.headquarters.as_deref(), Some("Omaha, Nebraska"));
        assert_eq!(fields.operating_regions.as_deref(), Some("North America"));
        assert_eq!(fields.country.as_deref(), Some("United States"));
        assert_eq!(fields.linkedin_url.len(), 1);
        assert_eq!(fields.linkedin_url[0].owner, "Acme Co");
        assert!(fields.description.unwrap().starts_with("Acme Co Acme | LinkedIn"));
    }

    #[tokio::test]
    async fn test_retries_without_company_suffix() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "Acme Co company"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(query_param("q", "Acme Co"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = enrich_company(&client_for(&server), "Acme Co", None).await;
        assert!(outcome.is_enriched());
    }

    #[tokio::test]
    async fn test_total_failure_uses_heuristics_only() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let outcome =
            enrich_company(&client_for(&server), "Maple Ltd", Some("Toronto, Ontario, Canada")).await;

        match outcome {
            Outcome::Degraded { value, .. } => {
                assert_eq!(value.country.as_deref(), Some("Canada"));
                assert!(value.website.is_none());
                assert!(value.linkedin_url.is_empty());
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stage_continues_past_failed_record() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "Acme Co company"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut records = vec![FirmRecord::new(1, "Acme Co"), FirmRecord::new(2, "Beta LLC")];
        records[1].location = Some("Leeds, England".to_string());

        let report = execute_search_stage(&client_for(&server), &mut records, &no_delay()).await;

        assert_eq!(report.records_enriched, 1);
        assert_eq!(report.records_degraded, 1);
        assert_eq!(records[0].profile.website.as_deref(), Some("https://www.acme.example/"));
        assert_eq!(records[1].profile.country.as_deref(), Some("United Kingdom"));
        assert!(records[1].profile.website.is_none());
    }

    /// Answers every query with the same page and notes when it was asked
    struct RecordingBackend {
        calls: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn fetch(&self, query: &str) -> Option<String> {
            self.calls.lock().unwrap().push((query.to_string(), Instant::now()));
            Some(PAGE.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_records() {
        let backend = RecordingBackend {
            calls: Mutex::new(Vec::new()),
        };
        let mut records = vec![
            FirmRecord::new(1, "Acme Co"),
            FirmRecord::new(2, "Beta LLC"),
            FirmRecord::new(3, "Gamma Inc"),
        ];
        let config = SearchStageConfig {
            batch_size: 2,
            delay: Duration::from_millis(400),
        };

        let started = Instant::now();
        let report = execute_search_stage(&backend, &mut records, &config).await;

        assert_eq!(started.elapsed(), Duration::from_millis(800));
        assert_eq!(report.chunks, 2);
        assert_eq!(report.records_enriched, 3);

        let calls = backend.calls.lock().unwrap();
        let queries: Vec<&str> = calls.iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(queries, vec!["Acme Co company", "Beta LLC company", "Gamma Inc company"]);
        assert_eq!(calls[0].1, started);
        assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(400));
        assert_eq!(calls[2].1 - calls[1].1, Duration::from_millis(400));
    }
}
