use crate::analysis::aggregate;
use crate::models::{ApiResponse, ResponseMeta};
use crate::server::{error::ApiError, AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Query string of `GET /api/drug-reactions`.
///
/// Everything is read as a string so that bad values get our own 400s
/// instead of the extractor's rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ReactionsQuery {
    #[serde(rename = "drugName")]
    pub drug_name: Option<String>,
    pub limit: Option<String>,
    pub search_after: Option<String>,
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "Server is working correctly!")
}

pub async fn drug_reactions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReactionsQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let drug_name = query
        .drug_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::MissingParameter("drugName"))?;

    let limit = parse_limit(query.limit.as_deref(), state.config.server.default_limit)?;

    let search_after = query
        .search_after
        .as_deref()
        .filter(|cursor| !cursor.is_empty());

    debug!(
        "Reactions request: drug={} limit={} search_after={:?}",
        drug_name, limit, search_after
    );

    let page = state
        .openfda
        .fetch_reactions(drug_name, limit, search_after)
        .await?;

    let reactions = aggregate(&page.response.results);
    info!(
        "Served {} reactions for '{}' ({} reports)",
        reactions.len(),
        drug_name,
        page.response.results.len()
    );

    Ok(Json(ApiResponse {
        reactions,
        meta: ResponseMeta::from(&page.response.meta),
        next_page_url: page.next_page_url.map(|url| strip_api_key(&url)),
    }))
}

/// Parse the `limit` query parameter: absent means `default`, anything
/// other than a positive integer is rejected.
pub fn parse_limit(raw: Option<&str>, default: u32) -> Result<u32, ApiError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(limit) if limit > 0 => Ok(limit),
            _ => Err(ApiError::InvalidLimit),
        },
    }
}

/// Remove the `api_key` parameter from an upstream URL before handing it to
/// clients. URLs that do not parse are returned unchanged.
fn strip_api_key(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    if !parsed.query_pairs().any(|(key, _)| key == "api_key") {
        return url.to_string();
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "api_key")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(kept);
    parsed.to_string()
}
