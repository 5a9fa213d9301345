//! Identity Providers (C1), spec §4.1.
//!
//! Normalizes provider-specific login payloads into a canonical
//! [`ProviderIdentity`]. Recognized variants are [`email`] (synthetic, for
//! tests and admin bootstrapping) and [`github`] (consumes an
//! already-obtained OAuth access token; the OAuth dance itself is out of
//! scope). Adding a provider means adding another implementation of
//! [`Normalize`] — the resolver and store are untouched, mirroring the
//! teacher's tagged-variant-over-payload pattern for pluggable backends
//! (e.g. `secrets::backends::registry`'s provider registry).

pub mod email;
pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A canonicalized external identity, independent of which provider issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// `<provider>:<stable-provider-subject>`, collision-free across variants.
    pub external_id: String,
    /// Lowercased RFC 5321 local/domain.
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// The three failure kinds spec §4.1 names, as an exhaustively-matchable
/// enum instead of prose, so C5 can decide retry/terminal behavior directly.
#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    /// Upstream unreachable; caller retries.
    #[error("identity provider unreachable: {message}")]
    Transient { message: String },

    /// Invalid token/signature; terminal.
    #[error("invalid identity: {message}")]
    InvalidIdentity { message: String },

    /// Missing email scope/claim; terminal.
    #[error("incomplete identity: {message}")]
    IncompleteIdentity { message: String },
}

/// Capability set `{Normalize(raw payload) → ProviderIdentity}`.
#[async_trait]
pub trait Normalize: Send + Sync {
    type Payload: Send + Sync;

    async fn normalize(&self, payload: Self::Payload) -> Result<ProviderIdentity, IdentityError>;
}

/// C1 failures cross the C5 boundary as [`crate::errors::VendingError`]:
/// `Transient` stays retryable, `InvalidIdentity`/`IncompleteIdentity` both
/// collapse to the wire-level `InvalidIdentity` (spec §7 names only five
/// kinds at the boundary; the two terminal C1 failures share one of them).
impl From<IdentityError> for crate::errors::VendingError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::Transient { message } => crate::errors::VendingError::Transient { message },
            IdentityError::InvalidIdentity { message } | IdentityError::IncompleteIdentity { message } => {
                crate::errors::VendingError::InvalidIdentity { message }
            }
        }
    }
}
