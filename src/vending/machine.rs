use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, field, info, instrument};

use crate::authz::{resolve_with_grants, Decision, HierarchyOracle};
use crate::config::TvmAuthConfig;
use crate::domain::{EntityScope, EntityType, Scope, UserId};
use crate::errors::VendingError;
use crate::identity::email::{EmailPayload, EmailProvider};
use crate::identity::github::{GithubClient, GithubPayload, GithubProvider, ReqwestGithubClient};
use crate::identity::Normalize;
use crate::storage::{DbPool, TokenMetadata, TokenRepository, TokenRow, UserRepository, UserRow, UserScopeRepository};

use super::token_format::generate_token;
use super::ExchangeRequest;

/// A primary-key collision on the token string is vanishingly unlikely at
/// 128 bits of entropy; this bound only guards against a broken RNG.
const MAX_TOKEN_INSERT_ATTEMPTS: u32 = 5;

/// Result of a successful `Exchange` (spec §4.5): the upserted user, the
/// freshly minted opaque token, and the expiry the caller should cache
/// alongside it.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub user: UserRow,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Orchestrates `Exchange`, `Verify`, `UpdateMemberRoles`, `Revoke`, and
/// `ListTokens` (spec §4.5) — the one component that owns transactions and
/// wires C1–C4 together. Generic over the GitHub HTTP client so production
/// code gets [`ReqwestGithubClient`] and tests can substitute a fake.
pub struct VendingMachine<C: GithubClient = ReqwestGithubClient> {
    pool: DbPool,
    users: Arc<dyn UserRepository>,
    user_scopes: Arc<dyn UserScopeRepository>,
    tokens: Arc<dyn TokenRepository>,
    oracle: Arc<dyn HierarchyOracle>,
    github: GithubProvider<C>,
    auth_config: TvmAuthConfig,
}

impl<C: GithubClient> VendingMachine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        users: Arc<dyn UserRepository>,
        user_scopes: Arc<dyn UserScopeRepository>,
        tokens: Arc<dyn TokenRepository>,
        oracle: Arc<dyn HierarchyOracle>,
        github_client: C,
        auth_config: TvmAuthConfig,
    ) -> Self {
        Self { pool, users, user_scopes, tokens, oracle, github: GithubProvider::new(github_client), auth_config }
    }

    /// `Exchange(provider_payload) -> (user, token_string)` (spec §4.5).
    /// Normalize → upsert user → read the user's persisted scopes as the
    /// token's snapshot → mint and insert the token, all in one transaction.
    #[instrument(name = "vending_exchange", skip(self, request), fields(user_id = field::Empty))]
    pub async fn exchange(&self, request: ExchangeRequest) -> Result<ExchangeOutcome, VendingError> {
        let identity = match request {
            ExchangeRequest::Email { email, name } => {
                EmailProvider.normalize(EmailPayload { email, name }).await?
            }
            ExchangeRequest::Github { access_token } => {
                self.github.normalize(GithubPayload { access_token }).await?
            }
        };

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.auth_config.login_token_duration())
                .map_err(|e| VendingError::transient(format!("invalid LoginTokenDuration: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let user = self
            .users
            .upsert(
                &mut tx,
                &identity.external_id,
                &identity.email,
                identity.name.as_deref(),
                identity.avatar_url.as_deref(),
            )
            .await?;

        tracing::Span::current().record("user_id", field::display(user.id));

        let rows: Vec<(EntityType, i64, Scope)> =
            sqlx::query_as("SELECT entity_type, entity_id, scope FROM user_scopes WHERE user_id = ?")
                .bind(user.id)
                .fetch_all(&mut *tx)
                .await?;
        let snapshot: Vec<EntityScope> =
            rows.into_iter().map(|(entity_type, entity_id, scope)| EntityScope::new(entity_type, entity_id, scope)).collect();

        let mut token = generate_token();
        let mut attempts = 0;
        loop {
            let inserted = self
                .tokens
                .insert(&mut tx, &token, None, &snapshot, EntityType::User, user.id, expires_at)
                .await?;
            if inserted {
                break;
            }
            attempts += 1;
            if attempts >= MAX_TOKEN_INSERT_ATTEMPTS {
                return Err(VendingError::transient("failed to generate a unique token after several attempts"));
            }
            token = generate_token();
        }

        tx.commit().await?;

        counter!("tvm_tokens_issued_total").increment(1);
        info!(user_id = user.id, scope_count = snapshot.len(), "issued login token via exchange");

        Ok(ExchangeOutcome { user, token, expires_at })
    }

    /// `Verify(token, target) -> Granted | *Error*` (spec §4.5). Resolves
    /// against the token's frozen snapshot, never a fresh `UserScope` read —
    /// the crucial design choice named in spec §4.5.
    #[instrument(name = "vending_verify", skip(self, token), fields(entity_type = %target.entity_type, entity_id = target.entity_id, scope = %target.scope))]
    pub async fn verify(&self, token: &str, target: EntityScope) -> Result<(), VendingError> {
        let row = self.require_active_token(token).await?;
        let user_id = UserId::new(row.entity_id);

        let decision = resolve_with_grants(user_id, row.snapshot(), target, self.oracle.as_ref()).await?;

        match decision {
            Decision::Granted => {
                counter!("tvm_verify_total", "outcome" => "granted").increment(1);
                Ok(())
            }
            Decision::InsufficientPermissions => {
                counter!("tvm_verify_total", "outcome" => "denied").increment(1);
                // Denials are routine, not exceptional — spec §7: log at
                // debug, never warn/error, so a flood of legitimate
                // permission checks doesn't drown the logs.
                debug!(user_id = user_id.inner(), "verify denied");
                Err(VendingError::InsufficientPermissions)
            }
        }
    }

    /// `UpdateMemberRoles(actor_token, target_user_id, add, remove) -> OK`
    /// (spec §4.5). All-or-nothing admin gate over `add ∪ remove`, then one
    /// transaction applying removes-then-adds, then invalidates every
    /// outstanding token of `target_user_id`.
    #[instrument(name = "vending_update_member_roles", skip(self, actor_token, add, remove), fields(target_user_id = target_user_id.inner()))]
    pub async fn update_member_roles(
        &self,
        actor_token: &str,
        target_user_id: UserId,
        add: Vec<EntityScope>,
        remove: Vec<EntityScope>,
    ) -> Result<(), VendingError> {
        let actor_row = self.require_active_token(actor_token).await?;

        if let Some(scope) = add.iter().find(|scope| remove.contains(scope)) {
            return Err(VendingError::invalid_argument(format!(
                "scope {scope} appears in both add and remove"
            )));
        }

        for scope in add.iter().chain(remove.iter()) {
            scope.validate()?;
            self.require_admin(&actor_row, scope.entity_type, scope.entity_id).await?;
        }

        let mut tx = self.pool.begin().await?;

        for scope in &remove {
            self.user_scopes.remove(&mut tx, target_user_id, *scope).await?;
        }
        for scope in &add {
            self.user_scopes.add(&mut tx, target_user_id, *scope).await?;
        }

        let invalidated =
            self.tokens.delete_all_for_subject(&mut tx, EntityType::User, target_user_id.inner()).await?;

        tx.commit().await?;

        counter!("tvm_tokens_invalidated_total").increment(invalidated);
        info!(
            target_user_id = target_user_id.inner(),
            added = add.len(),
            removed = remove.len(),
            invalidated,
            "updated member roles"
        );

        Ok(())
    }

    /// `Revoke(actor_token, subject, name) -> OK` (spec §4.5). Admin-gated
    /// on `subject`, same rule as [`Self::update_member_roles`].
    #[instrument(name = "vending_revoke", skip(self, actor_token, name), fields(entity_type = %subject.0, entity_id = subject.1))]
    pub async fn revoke(&self, actor_token: &str, subject: (EntityType, i64), name: &str) -> Result<(), VendingError> {
        let actor_row = self.require_active_token(actor_token).await?;
        self.require_admin(&actor_row, subject.0, subject.1).await?;

        let deleted = self.tokens.delete_by_name(name, subject.0, subject.1).await?;
        if !deleted {
            return Err(VendingError::invalid_argument(format!("no token named '{name}' found for this subject")));
        }

        counter!("tvm_tokens_revoked_total").increment(1);
        Ok(())
    }

    /// `ListTokens(actor_token, subject) -> [TokenMetadata]` (spec §4.5).
    /// Admin-gated like [`Self::revoke`]; never returns a raw token string.
    #[instrument(name = "vending_list_tokens", skip(self, actor_token), fields(entity_type = %subject.0, entity_id = subject.1))]
    pub async fn list_tokens(
        &self,
        actor_token: &str,
        subject: (EntityType, i64),
    ) -> Result<Vec<TokenMetadata>, VendingError> {
        let actor_row = self.require_active_token(actor_token).await?;
        self.require_admin(&actor_row, subject.0, subject.1).await?;

        Ok(self.tokens.list_by_subject(subject.0, subject.1).await?)
    }

    /// Background-sweeper hook (spec §4.4 `PurgeExpired`); not itself part
    /// of the wire protocol.
    pub async fn purge_expired(&self) -> Result<u64, VendingError> {
        Ok(self.tokens.purge_expired(Utc::now()).await?)
    }

    async fn require_active_token(&self, token: &str) -> Result<TokenRow, VendingError> {
        let row = self.tokens.lookup(token).await?.ok_or(VendingError::InvalidToken)?;
        if row.is_expired(Utc::now()) {
            return Err(VendingError::TokenExpired);
        }
        Ok(row)
    }

    /// Whether `actor_row`'s snapshot grants `admin` on `entity` or one of
    /// its ancestors — the gating rule spec §4.5 requires for every scope
    /// in `add ∪ remove`, and for the subject of `Revoke`/`ListTokens`.
    ///
    /// Evaluated against the actor's token *snapshot*, the same source
    /// `Verify` uses, rather than a fresh `UserScope` read — spec §4.5's
    /// "Verify the actor token normally" is read here as reusing `Verify`'s
    /// resolution path rather than bypassing the snapshot for this one check.
    async fn require_admin(
        &self,
        actor_row: &TokenRow,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<(), VendingError> {
        let actor_id = UserId::new(actor_row.entity_id);
        let target = EntityScope::new(entity_type, entity_id, Scope::Admin);
        let decision = resolve_with_grants(actor_id, actor_row.snapshot(), target, self.oracle.as_ref()).await?;

        if decision.is_granted() {
            Ok(())
        } else {
            Err(VendingError::InsufficientPermissions)
        }
    }
}
