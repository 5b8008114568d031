//! Throwaway HTTP servers for tests.
//!
//! `spawn_fake_openfda` serves two pages of canned reports that mimic the
//! openFDA drug event endpoint, including its `Link` header. Brand names
//! containing `RateLimited` get a 429 and `Unknown` gets openFDA's 404 body.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a fake openFDA endpoint and return its URL.
pub async fn spawn_fake_openfda() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/drug/event.json", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/drug/event.json", get(fake_drug_events))
        .with_state(Arc::new(url.clone()));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    url
}

/// Start the real backend router against a fake openFDA and return the
/// backend's base URL.
pub async fn spawn_backend() -> String {
    let mut config = crate::config::Config::default();
    config.upstream.base_url = spawn_fake_openfda().await;

    let state = crate::server::AppState::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let app = crate::server::router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    url
}

async fn fake_drug_events(
    State(self_url): State<Arc<String>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let search = params.get("search").cloned().unwrap_or_default();

    if search.contains("RateLimited") {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"code": "TOO_MANY_REQUESTS", "message": "slow down"}})),
        )
            .into_response();
    }
    if search.contains("Unknown") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": "NOT_FOUND", "message": "No matches found!"}})),
        )
            .into_response();
    }

    match params.get("search_after") {
        None => {
            let link = format!(
                "<{}?search=brand&limit=2&search_after=0%3D17>; rel=\"next\"",
                self_url
            );
            ([(header::LINK, link)], Json(first_page())).into_response()
        }
        Some(_) => Json(second_page()).into_response(),
    }
}

fn meta() -> Value {
    json!({
        "disclaimer": "Do not rely on openFDA to make decisions regarding medical care.",
        "last_updated": "2024-05-23",
        "results": {"skip": 0, "limit": 2, "total": 3}
    })
}

fn first_page() -> Value {
    json!({
        "meta": meta(),
        "results": [
            {"patient": {"reaction": [
                {"reactionmeddrapt": "NAUSEA", "reactionoutcome": "1"},
                {"reactionmeddrapt": "HEADACHE"}
            ]}},
            {"patient": {"reaction": [
                {"reactionmeddrapt": "NAUSEA"},
                {"reactionmeddrapt": "NAUSEA"}
            ]}}
        ]
    })
}

fn second_page() -> Value {
    json!({
        "meta": meta(),
        "results": [
            {"patient": {"reaction": [
                {"reactionmeddrapt": "FATIGUE", "reactionoutcome": "2"}
            ]}}
        ]
    })
}
