use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// DuckDuckGo's script-free results page
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// The results page is served to browsers only
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Configuration for the search client
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Results page URL; the query goes in the `q` parameter
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            timeout: Duration::from_secs(15),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Anything that can turn a query into a results page
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Results page markup, or `None` when the lookup failed
    async fn fetch(&self, query: &str) -> Option<String>;
}

/// Fetches raw search result markup
pub struct SearchClient {
    client: Client,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self { client, config })
    }

    /// Fetch the results page for a query.
    ///
    /// Any failure (transport, timeout, non-success status, empty body) is
    /// logged and reported as `None`.
    pub async fn fetch(&self, query: &str) -> Option<String> {
        match self.try_fetch(query).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Search for {:?} failed: {:#}", query, e);
                None
            }
        }
    }

    async fn try_fetch(&self, query: &str) -> Result<String> {
        debug!("Searching: {}", query);

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .context("Failed to send search request")?;

        if !response.status().is_success() {
            anyhow::bail!("search endpoint returned {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read search response body")?;

        if body.trim().is_empty() {
            anyhow::bail!("search endpoint returned an empty page");
        }

        Ok(body)
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn fetch(&self, query: &str) -> Option<String> {
        SearchClient::fetch(self, query).await
    }
}
