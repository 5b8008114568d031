//! Client for the backend's `GET /api/drug-reactions`.
//!
//! The backend answers with an absolute `nextPageUrl`; the cursor for the
//! next request is the `search_after` parameter inside it.

use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::models::ApiResponse;
use crate::pagination::{cursor_from_next_page_url, FetchedPage, PageSource, CURSOR_PARAM};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the reaction search backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl BackendClient {
    pub fn new(config: &ClientConfig, timeout_seconds: u64) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(FetchError::from_reqwest)?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/api/drug-reactions", config.api_url.trim_end_matches('/')),
        })
    }

    /// Request one page from the backend and return its JSON body.
    pub async fn fetch_reactions(
        &self,
        drug_name: &str,
        limit: u32,
        search_after: Option<&str>,
    ) -> Result<ApiResponse, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("drugName", drug_name.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(cursor) = search_after {
            params.push((CURSOR_PARAM, cursor.to_string()));
        }

        debug!("GET {} {:?}", self.endpoint, params);

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Backend error {}: {}", status, body);
            return Err(FetchError::upstream(status.as_u16(), &body));
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PageSource for BackendClient {
    async fn fetch_page(
        &self,
        query: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, FetchError> {
        let response = self.fetch_reactions(query, limit, cursor).await?;

        Ok(FetchedPage {
            next_cursor: response
                .next_page_url
                .as_deref()
                .and_then(cursor_from_next_page_url),
            reactions: response.reactions,
            meta: response.meta,
        })
    }
}
