//! HTTP handlers for the five wire methods spec §6 names, plus a health
//! endpoint. One handler per RPC method, following the teacher's
//! `api::handlers` shape (`State(state)` extractor, `Result<_, ApiError>`
//! return, an `#[instrument]`-free body since [`crate::vending::VendingMachine`]
//! already instruments each operation).

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::domain::UserId;
use crate::errors::VendingError;

use super::dto::{
    ComponentHealthDto, ExchangeBody, ExchangeResponse, HealthResponse, ListTokensQuery,
    ListTokensResponse, RevokeBody, UpdateMemberRolesBody, UserDto,
};
use super::error::ApiError;
use super::routes::AppState;

/// Pulls the bearer token out of `Authorization: Bearer <token>`. All
/// operations but `Exchange` require one (spec §6's `actor_token` /
/// `token` parameters); a missing or malformed header is reported as
/// `INVALID_TOKEN`, the same code a present-but-unknown token gets, so the
/// header's absence isn't distinguishable from a bad token (spec §7: no
/// detail is disclosed about *why* authentication failed beyond the kind).
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::from(VendingError::InvalidToken))
}

/// `Exchange(provider_payload) -> (User, token)` (spec §6).
pub async fn exchange_handler(
    State(state): State<AppState>,
    Json(body): Json<ExchangeBody>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    let outcome = state.machine.exchange(body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ExchangeResponse {
            user: UserDto::from(outcome.user),
            token: outcome.token,
            expires_at: outcome.expires_at,
        }),
    ))
}

/// `Verify(token, scope) -> (empty) | Error` (spec §6).
pub async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(target): Json<crate::domain::EntityScope>,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;
    state.machine.verify(token, target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `UpdateMemberRoles(actor_token, target_user_id, add, remove) -> (empty) | Error` (spec §6).
pub async fn update_member_roles_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateMemberRolesBody>,
) -> Result<StatusCode, ApiError> {
    let actor_token = bearer_token(&headers)?;

    state
        .machine
        .update_member_roles(actor_token, UserId::new(body.target_user_id), body.add, body.remove)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `Revoke(actor_token, subject, name) -> (empty) | Error` (spec §6).
pub async fn revoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RevokeBody>,
) -> Result<StatusCode, ApiError> {
    let actor_token = bearer_token(&headers)?;

    state
        .machine
        .revoke(actor_token, (body.subject_type, body.subject_id), &body.name)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `ListTokens(actor_token, subject) -> [TokenMetadata]` (spec §6).
pub async fn list_tokens_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListTokensQuery>,
) -> Result<Json<ListTokensResponse>, ApiError> {
    let actor_token = bearer_token(&headers)?;

    let tokens = state
        .machine
        .list_tokens(actor_token, (params.subject_type, params.subject_id))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ListTokensResponse { tokens }))
}

/// Liveness/readiness probe: reports the health of TVM's one real
/// dependency, the database (spec §9's hierarchy oracle and every
/// repository share the same pool).
pub async fn health_handler(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let checks = state.health.check_all().await.unwrap_or_default();

    let operational = checks.values().all(|check| check.status.is_operational());
    let status_code = if operational { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    let components = checks
        .into_iter()
        .map(|(name, check)| {
            let status = match &check.status {
                crate::observability::HealthStatus::Healthy => "healthy",
                crate::observability::HealthStatus::Degraded { .. } => "degraded",
                crate::observability::HealthStatus::Unhealthy { .. } => "unhealthy",
            };
            (name, ComponentHealthDto { status: status.to_string(), message: check.status.message().map(str::to_string) })
        })
        .collect();

    let body = HealthResponse { status: if operational { "ok" } else { "degraded" }.to_string(), components };

    (status_code, Json(body))
}
