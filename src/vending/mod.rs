//! Vending Machine (C5), spec §4.5 — the component that wires the other
//! four together: `Exchange` (login → user create-or-get → mint token),
//! `Verify` (token → scope check against its frozen snapshot),
//! `UpdateMemberRoles` (admin-gated scope mutation → token invalidation),
//! `Revoke`, and `ListTokens`.
//!
//! Grounded on the teacher's `auth::auth_service::AuthService` (the
//! `authenticate` → lookup-token → check-expiry → check-scope shape
//! `verify` reuses almost verbatim) and `auth::token_service::TokenService`
//! (the issue-a-token transactional shape `exchange` generalizes from
//! hashed-PAT-plus-argon2 to a directly-looked-up opaque token, since spec
//! §1 explicitly rules out signing/hashing machinery here).

mod machine;
mod token_format;

pub use machine::{ExchangeOutcome, VendingMachine};
pub use token_format::generate_token;

use serde::Deserialize;

/// The wire shape of `Exchange(provider_payload)` (spec §6): a tagged union
/// over the recognized provider variants (spec §4.1). Adding a provider
/// means adding a variant here and a match arm in
/// [`machine::VendingMachine::exchange`] — the rest of C5 is untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ExchangeRequest {
    Email { email: String, name: Option<String> },
    Github { access_token: String },
}
