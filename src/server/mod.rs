//! Backend HTTP proxy in front of openFDA.
//!
//! Exposes `GET /api/drug-reactions`, which validates the request, fetches
//! one page from openFDA, aggregates the reactions in it and passes the
//! next-page link through. The server keeps no per-client state; paging
//! state lives entirely in the client's search session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::upstream::OpenFdaClient;
use routes::{drug_reactions_handler, health_handler};

pub struct AppState {
    pub config: Config,
    pub openfda: OpenFdaClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let openfda =
            OpenFdaClient::new(&config.upstream).context("Failed to create openFDA client")?;

        Ok(Arc::new(Self { config, openfda }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(state.config.server.cors_max_age_seconds));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/drug-reactions", get(drug_reactions_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing state...");
    let address = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config)?;

    info!("Starting server...");
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_fake_openfda;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app_with_upstream(base_url: String) -> Router {
        let mut config = Config::default();
        config.upstream.base_url = base_url;
        router(AppState::new(config).unwrap())
    }

    async fn app() -> Router {
        app_with_upstream(spawn_fake_openfda().await).await
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        (status, payload)
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");
        let response = app().await.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_first_page() {
        let (status, body) =
            get_json(app().await, "/api/drug-reactions?drugName=Tylenol&limit=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reactions"][0]["term"], "NAUSEA");
        assert_eq!(body["reactions"][0]["count"], 3);
        assert_eq!(body["reactions"][1]["term"], "HEADACHE");
        assert_eq!(body["meta"]["total"], 3);
        assert_eq!(body["meta"]["lastUpdated"], "2024-05-23");
        assert!(body["nextPageUrl"]
            .as_str()
            .unwrap()
            .contains("search_after=0%3D17"));
    }

    #[tokio::test]
    async fn test_next_page_with_cursor() {
        let (status, body) = get_json(
            app().await,
            "/api/drug-reactions?drugName=Tylenol&limit=2&search_after=0%3D17",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reactions"][0]["term"], "FATIGUE");
        assert!(body["nextPageUrl"].is_null());
    }

    #[tokio::test]
    async fn test_missing_drug_name() {
        // nothing listens upstream, so a 400 proves no upstream call was made
        let app = app_with_upstream("http://127.0.0.1:9/drug/event.json".to_string()).await;

        let (status, body) = get_json(app.clone(), "/api/drug-reactions").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing parameter");

        let (status, _) = get_json(app, "/api/drug-reactions?drugName=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_limit() {
        for limit in ["0", "-3", "abc", "2.5"] {
            let uri = format!("/api/drug-reactions?drugName=Tylenol&limit={}", limit);
            let (status, body) = get_json(app().await, &uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "limit={}", limit);
            assert_eq!(body["error"], "Invalid limit parameter");
        }
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let (status, body) =
            get_json(app().await, "/api/drug-reactions?drugName=RateLimited").await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_upstream_error_passthrough() {
        let (status, body) =
            get_json(app().await, "/api/drug-reactions?drugName=Unknown").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No matches found!");
        assert_eq!(body["details"]["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let app = app_with_upstream("http://127.0.0.1:9/drug/event.json".to_string()).await;
        let (status, body) = get_json(app, "/api/drug-reactions?drugName=Tylenol").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert!(body["details"].is_string());
    }
}
