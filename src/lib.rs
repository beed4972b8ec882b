//! Dive decompression planner.
//!
//! Bühlmann ZH-L16 gradient factor decompression engine with a small
//! Rust/Axum API in front of it.

use std::sync::Arc;

use axum::{response::Json, routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub mod config;
pub mod deco;
pub mod error;

use deco::EngineConfig;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Engine configuration used unless a request overrides it
    pub defaults: Arc<EngineConfig>,
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Deco planning API
        .nest("/api/deco", deco::router())
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "diveops-deco"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            defaults: Arc::new(EngineConfig::default()),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
    }

    #[tokio::test]
    async fn test_deco_routes_nested() {
        let response = app(state())
            .oneshot(
                Request::builder()
                    .uri("/api/deco/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!("ZH-L16B-GF", body["model"]);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app(state())
            .oneshot(Request::builder().uri("/api/deco/validate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(StatusCode::NOT_FOUND, response.status());
    }
}
