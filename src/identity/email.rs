//! Synthetic `email` identity provider: used by tests and admin bootstrap.
//! The payload already carries the asserted identity; there is no network
//! call and no way for this provider to produce a `Transient` failure.

use async_trait::async_trait;

use super::{IdentityError, Normalize, ProviderIdentity};

/// A raw, caller-asserted email-identity payload.
#[derive(Debug, Clone)]
pub struct EmailPayload {
    pub email: String,
    pub name: Option<String>,
}

/// Normalizes [`EmailPayload`]s. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailProvider;

#[async_trait]
impl Normalize for EmailProvider {
    type Payload = EmailPayload;

    async fn normalize(&self, payload: Self::Payload) -> Result<ProviderIdentity, IdentityError> {
        let email = payload.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(IdentityError::InvalidIdentity {
                message: "email payload did not contain a valid address".to_string(),
            });
        }

        Ok(ProviderIdentity {
            external_id: format!("email:{email}"),
            email,
            name: payload.name,
            avatar_url: None,
        })
    }
}
