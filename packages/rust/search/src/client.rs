//! SERP proxy client.
//!
//! Google result pages are fetched through a proxy that takes the target URL
//! in a JSON body and returns the raw HTML. Failures from the proxy degrade to
//! an empty result list; only a missing API key is reported as an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use vendorrisk_shared::{Finding, Result, SearchConfig, VendorRiskError};

use crate::layouts::LayoutRegistry;

/// User-Agent string for proxy requests.
const USER_AGENT: &str = concat!("VendorRisk/", env!("CARGO_PKG_VERSION"));

/// Base URL of the search engine whose result pages are scraped.
const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";

// ---------------------------------------------------------------------------
// FindingSource
// ---------------------------------------------------------------------------

/// Anything that can produce web findings for a company.
#[async_trait]
pub trait FindingSource: Send + Sync {
    async fn fetch_findings(&self, company: &str) -> Result<Vec<Finding>>;
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// Build the Google search URL used to gather evidence about `company`.
pub fn build_search_url(company: &str) -> Url {
    let query =
        format!("Recent financial, security breaches or lawsuits data involving {company}");
    let mut url = Url::parse(GOOGLE_SEARCH_URL).expect("constant URL is valid");
    url.query_pairs_mut()
        .append_pair("q", &query)
        .append_pair("brd_mobile", "desktop");
    url
}

/// Parse a raw result page into findings.
pub fn parse_serp_html(html: &str) -> Vec<Finding> {
    let doc = Html::parse_document(html);
    match LayoutRegistry::new().extract(&doc) {
        Some((layout, findings)) => {
            debug!(layout, count = findings.len(), "extracted findings");
            findings
        }
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Fetches result pages through the SERP proxy and extracts findings.
pub struct SearchClient {
    client: Client,
    endpoint: String,
    zone: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl SearchClient {
    /// Build a client from config, reading the API key from the configured env var.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = vendorrisk_shared::resolve_api_key(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(env = %config.api_key_env, "search API key not set, fetches will fail");
        }
        Self::build(config, api_key)
    }

    /// Build a client with an explicit API key (bypasses the env var).
    pub fn with_api_key(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::build(config, Some(api_key.into()))
    }

    fn build(config: &SearchConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VendorRiskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            zone: config.zone.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
        })
    }

    /// Fetch and parse Google results for `company`.
    ///
    /// Proxy errors and non-success statuses are logged and yield an empty list.
    #[instrument(skip(self))]
    pub async fn search(&self, company: &str) -> Result<Vec<Finding>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            VendorRiskError::config(format!(
                "{} not set. Please set your search proxy API key.",
                self.api_key_env
            ))
        })?;

        let search_url = build_search_url(company);
        let payload = serde_json::json!({
            "zone": self.zone,
            "url": search_url.as_str(),
            "format": "raw",
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "search request failed");
                return Ok(Vec::new());
            }
        };

        let status = response.status();
        info!(status = status.as_u16(), "search proxy responded");

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read search response body");
                return Ok(Vec::new());
            }
        };

        if !status.is_success() {
            warn!(%status, body = %body, "search proxy returned an error");
            return Ok(Vec::new());
        }

        Ok(parse_serp_html(&body))
    }
}

#[async_trait]
impl FindingSource for SearchClient {
    async fn fetch_findings(&self, company: &str) -> Result<Vec<Finding>> {
        self.search(company).await
    }
}
