//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for scenarios and their inputs
//! - Projection, comparison, and sensitivity endpoints
//! - JSON error mapping

pub mod error;
pub mod routes;

use axum::Router;
use cimiento_core::projection::{ProjectionCache, ProjectionOptions};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Cache of projection results keyed by scenario revision.
    pub cache: ProjectionCache,
    /// Engine options applied to every projection.
    pub options: ProjectionOptions,
    /// Discount rate for scenarios created without one.
    pub default_discount_rate: Decimal,
}

impl AppState {
    /// Creates state with the given cache and engine options.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        cache: ProjectionCache,
        options: ProjectionOptions,
        default_discount_rate: Decimal,
    ) -> Self {
        Self {
            db: Arc::new(db),
            cache,
            options,
            default_discount_rate,
        }
    }

    /// Engine options with an optional per-request discount rate.
    #[must_use]
    pub fn options_with(&self, discount_rate: Option<Decimal>) -> ProjectionOptions {
        ProjectionOptions {
            discount_rate_override: discount_rate.or(self.options.discount_rate_override),
            ..self.options.clone()
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(
            DatabaseConnection::Disconnected,
            ProjectionCache::new(),
            ProjectionOptions::default(),
            dec!(0.12),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_invalid_scenario_id_rejected() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/scenarios/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_scenario_validation_before_db() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/scenarios")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"Torre Norte","start_date":"2026-01-01","duration_months":0}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_duration");
    }

    #[test]
    fn test_options_with_override() {
        let state = test_state();
        assert_eq!(state.options_with(None).discount_rate_override, None);
        assert_eq!(
            state.options_with(Some(dec!(0.08))).discount_rate_override,
            Some(dec!(0.08))
        );
    }
}
