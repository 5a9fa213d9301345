//! Domain-boundary error taxonomy for the Vending Machine (C5), spec §6/§7.
//!
//! `VendingError` is what every public TVM operation — `Exchange`, `Verify`,
//! `UpdateMemberRoles`, `Revoke`, `ListTokens` — actually returns to callers.
//! It carries exactly the five kinds (six wire codes) spec §7 names; the
//! teacher's analogous boundary type is `auth::models::AuthError`.

use std::fmt;

use crate::errors::TvmError;

#[derive(thiserror::Error, Debug)]
pub enum VendingError {
    /// C1 provider-normalization failure: bad token/signature.
    #[error("invalid identity: {message}")]
    InvalidIdentity { message: String },

    /// Token string not present in the store.
    #[error("invalid token")]
    InvalidToken,

    /// Token found but `now >= expires_at`.
    #[error("token expired")]
    TokenExpired,

    /// Resolver denied the request. The missing grant is deliberately not
    /// named in the message (spec §7: "the exact missing grant is NOT
    /// disclosed").
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// Malformed scope, unknown entity type, contradictory add/remove sets.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Storage/upstream unavailability. Retryable by the caller; TVM does
    /// not retry internally.
    #[error("transient failure: {message}")]
    Transient { message: String },
}

impl VendingError {
    /// The wire error code spec §6 defines, stable across transports.
    pub const fn wire_code(&self) -> &'static str {
        match self {
            VendingError::InvalidIdentity { .. } => "INVALID_IDENTITY",
            VendingError::InvalidToken => "INVALID_TOKEN",
            VendingError::TokenExpired => "TOKEN_EXPIRED",
            VendingError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            VendingError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            VendingError::Transient { .. } => "TRANSIENT",
        }
    }

    /// HTTP status the `api` layer maps this onto.
    pub const fn status_code(&self) -> u16 {
        match self {
            VendingError::InvalidIdentity { .. } => 401,
            VendingError::InvalidToken => 401,
            VendingError::TokenExpired => 401,
            VendingError::InsufficientPermissions => 403,
            VendingError::InvalidArgument { .. } => 400,
            VendingError::Transient { .. } => 503,
        }
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, VendingError::Transient { .. })
    }

    pub fn invalid_identity<S: fmt::Display>(message: S) -> Self {
        Self::InvalidIdentity { message: message.to_string() }
    }

    pub fn invalid_argument<S: fmt::Display>(message: S) -> Self {
        Self::InvalidArgument { message: message.to_string() }
    }

    pub fn transient<S: fmt::Display>(message: S) -> Self {
        Self::Transient { message: message.to_string() }
    }
}

/// Storage failures always surface as `Transient` at the C5 boundary
/// (spec §4.3/§7: "storage errors propagate as `TransientError`").
impl From<TvmError> for VendingError {
    fn from(error: TvmError) -> Self {
        VendingError::Transient { message: error.to_string() }
    }
}

impl From<sqlx::Error> for VendingError {
    fn from(error: sqlx::Error) -> Self {
        VendingError::Transient { message: error.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_spec_six() {
        assert_eq!(VendingError::InvalidToken.wire_code(), "INVALID_TOKEN");
        assert_eq!(VendingError::TokenExpired.wire_code(), "TOKEN_EXPIRED");
        assert_eq!(VendingError::InsufficientPermissions.wire_code(), "INSUFFICIENT_PERMISSIONS");
        assert_eq!(
            VendingError::invalid_argument("bad").wire_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(VendingError::transient("db down").wire_code(), "TRANSIENT");
        assert_eq!(VendingError::invalid_identity("bad sig").wire_code(), "INVALID_IDENTITY");
    }

    #[test]
    fn storage_errors_always_become_transient() {
        let err: VendingError = TvmError::internal("boom").into();
        assert!(matches!(err, VendingError::Transient { .. }));
        assert!(err.is_retryable());
    }
}
