//! openFDA drug adverse event client.
//!
//! Builds the structured `search` query, sends one paginated request,
//! and pulls the next-page URL out of the `Link` response header.

use crate::analysis::aggregate;
use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::models::{OpenFdaResponse, ResponseMeta};
use crate::pagination::{cursor_from_next_page_url, FetchedPage, PageSource, CURSOR_PARAM};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::LINK;
use reqwest::StatusCode;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Field that holds the brand name in openFDA drug event reports.
const BRAND_NAME_FIELD: &str = "patient.drug.openfda.brand_name";

/// One page of raw openFDA results plus the link to the next one.
#[derive(Debug, Clone)]
pub struct UpstreamPage {
    pub response: OpenFdaResponse,
    pub next_page_url: Option<String>,
}

/// HTTP client for the openFDA drug event endpoint.
#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    sort: Option<String>,
}

impl OpenFdaClient {
    /// Create a client from the upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(FetchError::from_reqwest)?;

        info!("openFDA client targeting {}", config.base_url);

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            sort: config.sort.clone(),
        })
    }

    /// Fetch one page of reports mentioning `drug_name`.
    ///
    /// `search_after` is the opaque cursor from a previous page's next link;
    /// leave it out for the first page.
    pub async fn fetch_reactions(
        &self,
        drug_name: &str,
        limit: u32,
        search_after: Option<&str>,
    ) -> Result<UpstreamPage, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("search", build_search_query(drug_name)),
            ("limit", limit.to_string()),
        ];
        if let Some(ref sort) = self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(cursor) = search_after {
            params.push((CURSOR_PARAM, cursor.to_string()));
        }
        if let Some(ref key) = self.api_key {
            params.push(("api_key", key.clone()));
        }

        debug!(
            "GET {} drug={} limit={} search_after={:?}",
            self.base_url, drug_name, limit, search_after
        );

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("openFDA rate limit hit for '{}'", drug_name);
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("openFDA error {} for '{}': {}", status, drug_name, body);
            return Err(FetchError::upstream(status.as_u16(), &body));
        }

        let next_page_url = extract_next_page_url(
            response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok()),
        );

        let response: OpenFdaResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode openFDA response: {}", e);
            FetchError::Decode(e.to_string())
        })?;

        debug!(
            "openFDA returned {} of {} reports, next page: {}",
            response.results.len(),
            response.meta.results.total,
            next_page_url.is_some()
        );

        Ok(UpstreamPage {
            response,
            next_page_url,
        })
    }
}

#[async_trait]
impl PageSource for OpenFdaClient {
    async fn fetch_page(
        &self,
        query: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, FetchError> {
        let page = self.fetch_reactions(query, limit, cursor).await?;

        Ok(FetchedPage {
            reactions: aggregate(&page.response.results),
            next_cursor: page
                .next_page_url
                .as_deref()
                .and_then(cursor_from_next_page_url),
            meta: ResponseMeta::from(&page.response.meta),
        })
    }
}

/// Build the openFDA `search` expression for a brand name.
///
/// Double quotes are stripped from the name so it cannot break out of the
/// quoted phrase.
pub fn build_search_query(drug_name: &str) -> String {
    let name: String = drug_name.trim().chars().filter(|c| *c != '"').collect();
    format!("{}:\"{}\"", BRAND_NAME_FIELD, name)
}

/// Extract the `rel="next"` target from a `Link` header value.
pub fn extract_next_page_url(link_header: Option<&str>) -> Option<String> {
    static NEXT_LINK: OnceLock<Regex> = OnceLock::new();

    let header = link_header?;
    let regex = NEXT_LINK.get_or_init(|| {
        Regex::new(r#"<([^>]+)>;\s*rel="next""#).expect("next link pattern is valid")
    });

    regex
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}
