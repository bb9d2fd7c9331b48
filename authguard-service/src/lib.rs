//! Authentication security core.
//!
//! The engineering lives in `services`: attempt limiting, password policy
//! and breach checking, role evaluation, the audit trail, alert fan-out,
//! and session revalidation. The HTTP layer is a thin JSON surface over
//! the orchestrator; callers embedding the crate as a library can skip it
//! and construct the services directly.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GuardConfig;
use crate::services::{AuthOrchestrator, SessionGuard};

#[derive(Clone)]
pub struct AppState {
    pub config: GuardConfig,
    pub orchestrator: Arc<AuthOrchestrator>,
    pub session_guard: SessionGuard,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| {
                    o.parse::<HeaderValue>()
                        .map_err(|e| {
                            tracing::error!(origin = %o, error = %e, "Invalid CORS origin, skipping");
                        })
                        .ok()
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/authz/check", post(handlers::authz::check_permission))
        .route(
            "/session/revalidate",
            post(handlers::authz::revalidate_session),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Service health check
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    }))
}
