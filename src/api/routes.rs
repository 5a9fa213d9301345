//! Router assembly: [`AppState`], CORS, and the six TVM endpoints.
//!
//! Grounded on the teacher's `api::routes` (`build_cors_layer`,
//! `pub fn build_router(state: ...) -> Router`), trimmed from its
//! dozens of xDS/MCP/admin routes down to spec §6's five RPC-shaped
//! methods plus `/health`.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::identity::github::ReqwestGithubClient;
use crate::observability::HealthChecker;
use crate::vending::VendingMachine;

use super::handlers::{
    exchange_handler, health_handler, list_tokens_handler, revoke_handler,
    update_member_roles_handler, verify_handler,
};

/// Shared state every handler extracts: the orchestrator and the health
/// registry. Cheap to clone — both fields are already `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<VendingMachine<ReqwestGithubClient>>,
    pub health: Arc<HealthChecker>,
}

/// CORS policy for TVM's API. Mirrors the teacher's `build_cors_layer`
/// (env-driven allow-list via a predicate, not a wildcard) with the
/// variable renamed to TVM's own prefix.
fn build_cors_layer() -> CorsLayer {
    let allowed_origins_str =
        std::env::var("TVM_UI_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let allowed_origins: Vec<String> = allowed_origins_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    tracing::info!(allowed_origins = ?allowed_origins, "configuring CORS");

    let origins = allowed_origins.clone();
    let allow_origin = AllowOrigin::predicate(move |origin, _request_parts| {
        origin.to_str().map(|o| origins.iter().any(|allowed| allowed == o)).unwrap_or(false)
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Builds the full TVM router: `/health` is unauthenticated, the five
/// vending-machine methods each extract their own bearer token inside the
/// handler (spec §6/§7 — there's no separate auth middleware layer here,
/// [`VendingMachine`]'s methods already gate on the token they're passed).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/exchange", post(exchange_handler))
        .route("/verify", post(verify_handler))
        .route("/member-roles", post(update_member_roles_handler))
        .route("/revoke", post(revoke_handler))
        .route("/tokens", get(list_tokens_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
