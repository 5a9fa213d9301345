//! Wire-protocol request/response DTOs (spec §6), documented with `utoipa`
//! the way the teacher documents its own HTTP resource DTOs
//! (`domain::cluster`, `domain::filter`, ...). These are thin serde shapes
//! around the domain/vending types — the handlers in [`super::handlers`]
//! are the only place that bridges them to [`crate::vending::VendingMachine`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EntityScope;
use crate::storage::{TokenMetadata, UserRow};
use crate::vending::ExchangeRequest;

/// `Exchange(provider_payload)` request body (spec §6). Mirrors
/// [`ExchangeRequest`]'s tagged-union shape so the wire schema and the
/// internal type never drift; kept separate so `utoipa::ToSchema` doesn't
/// have to be derived on a type that also carries identity-provider payload
/// semantics.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ExchangeBody {
    Email { email: String, name: Option<String> },
    Github { access_token: String },
}

impl From<ExchangeBody> for ExchangeRequest {
    fn from(body: ExchangeBody) -> Self {
        match body {
            ExchangeBody::Email { email, name } => ExchangeRequest::Email { email, name },
            ExchangeBody::Github { access_token } => ExchangeRequest::Github { access_token },
        }
    }
}

/// `{User, token}` response for a successful `Exchange`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExchangeResponse {
    pub user: UserDto,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDto {
    pub id: i64,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            name: row.name,
            avatar_url: row.avatar_url,
        }
    }
}

/// `UpdateMemberRoles(actor_token, target_user_id, add, remove)` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateMemberRolesBody {
    pub target_user_id: i64,
    #[serde(default)]
    pub add: Vec<EntityScope>,
    #[serde(default)]
    pub remove: Vec<EntityScope>,
}

/// `Revoke(actor_token, subject, name)` request body. `subject` is carried
/// as the two flat fields below rather than a nested object, mirroring the
/// wire shape's `(EntityType, id)` tuple.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RevokeBody {
    pub subject_type: crate::domain::EntityType,
    pub subject_id: i64,
    pub name: String,
}

/// Query parameters for `ListTokens(actor_token, subject)`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListTokensQuery {
    pub subject_type: crate::domain::EntityType,
    pub subject_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenMetadataDto {
    pub name: Option<String>,
    pub entity_type: crate::domain::EntityType,
    pub entity_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<TokenMetadata> for TokenMetadataDto {
    fn from(meta: TokenMetadata) -> Self {
        Self {
            name: meta.name,
            entity_type: meta.entity_type,
            entity_id: meta.entity_id,
            expires_at: meta.expires_at,
            created_at: meta.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListTokensResponse {
    pub tokens: Vec<TokenMetadataDto>,
}

/// Liveness/readiness probe response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub components: std::collections::HashMap<String, ComponentHealthDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealthDto {
    pub status: String,
    pub message: Option<String>,
}
