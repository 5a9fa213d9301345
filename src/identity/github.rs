//! `github` identity provider: normalizes an already-obtained OAuth access
//! token by calling GitHub's user-info endpoint. The OAuth device/web flow
//! that produced the token is out of scope (spec §1) — we only consume its
//! output. The outbound HTTP call is injected through [`GithubClient`] so
//! the provider is unit-testable without the network, the same seam the
//! teacher uses around its pluggable secrets backends.

use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentityError, Normalize, ProviderIdentity};

const GITHUB_USER_ENDPOINT: &str = "https://api.github.com/user";

/// The subset of GitHub's `/user` response this provider needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUserProfile {
    pub id: i64,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Outbound HTTP seam, so tests can substitute a fake without a real socket.
#[async_trait]
pub trait GithubClient: Send + Sync {
    async fn fetch_user(&self, access_token: &str) -> Result<GithubUserProfile, IdentityError>;
}

/// `reqwest`-backed [`GithubClient`], the only production implementation.
pub struct ReqwestGithubClient {
    http: reqwest::Client,
}

impl ReqwestGithubClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }
}

impl Default for ReqwestGithubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GithubClient for ReqwestGithubClient {
    async fn fetch_user(&self, access_token: &str) -> Result<GithubUserProfile, IdentityError> {
        let response = self
            .http
            .get(GITHUB_USER_ENDPOINT)
            .bearer_auth(access_token)
            .header("User-Agent", "tvm")
            .send()
            .await
            .map_err(|e| IdentityError::Transient { message: format!("github unreachable: {e}") })?;

        match response.status().as_u16() {
            200 => response
                .json::<GithubUserProfile>()
                .await
                .map_err(|e| IdentityError::InvalidIdentity {
                    message: format!("malformed github user payload: {e}"),
                }),
            401 | 403 => Err(IdentityError::InvalidIdentity {
                message: "github rejected the access token".to_string(),
            }),
            status if status >= 500 => {
                Err(IdentityError::Transient { message: format!("github returned {status}") })
            }
            status => Err(IdentityError::InvalidIdentity {
                message: format!("unexpected github response status {status}"),
            }),
        }
    }
}

/// Payload for the `github` provider: an already-issued OAuth access token.
#[derive(Debug, Clone)]
pub struct GithubPayload {
    pub access_token: String,
}

pub struct GithubProvider<C: GithubClient> {
    client: C,
}

impl<C: GithubClient> GithubProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: GithubClient> Normalize for GithubProvider<C> {
    type Payload = GithubPayload;

    async fn normalize(&self, payload: Self::Payload) -> Result<ProviderIdentity, IdentityError> {
        let profile = self.client.fetch_user(&payload.access_token).await?;

        let email = profile.email.ok_or_else(|| IdentityError::IncompleteIdentity {
            message: "github profile did not include an email (missing `user:email` scope)"
                .to_string(),
        })?;
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(IdentityError::IncompleteIdentity {
                message: "github profile returned an empty email".to_string(),
            });
        }

        Ok(ProviderIdentity {
            external_id: format!("github:{}", profile.id),
            email,
            name: profile.name,
            avatar_url: profile.avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClient {
        profile: Result<GithubUserProfile, IdentityError>,
    }

    #[async_trait]
    impl GithubClient for FakeClient {
        async fn fetch_user(&self, _access_token: &str) -> Result<GithubUserProfile, IdentityError> {
            match &self.profile {
                Ok(p) => Ok(p.clone()),
                Err(IdentityError::Transient { message }) => {
                    Err(IdentityError::Transient { message: message.clone() })
                }
                Err(IdentityError::InvalidIdentity { message }) => {
                    Err(IdentityError::InvalidIdentity { message: message.clone() })
                }
                Err(IdentityError::IncompleteIdentity { message }) => {
                    Err(IdentityError::IncompleteIdentity { message: message.clone() })
                }
            }
        }
    }

    #[tokio::test]
    async fn normalizes_a_complete_profile() {
        let provider = GithubProvider::new(FakeClient {
            profile: Ok(GithubUserProfile {
                id: 42,
                email: Some("Octo@GitHub.com".to_string()),
                name: Some("Octo Cat".to_string()),
                avatar_url: Some("https://example.com/a.png".to_string()),
            }),
        });

        let identity = provider.normalize(GithubPayload { access_token: "tok".to_string() }).await.unwrap();
        assert_eq!(identity.external_id, "github:42");
        assert_eq!(identity.email, "octo@github.com");
    }

    #[tokio::test]
    async fn missing_email_is_incomplete_identity() {
        let provider = GithubProvider::new(FakeClient {
            profile: Ok(GithubUserProfile { id: 1, email: None, name: None, avatar_url: None }),
        });

        let result = provider.normalize(GithubPayload { access_token: "tok".to_string() }).await;
        assert!(matches!(result, Err(IdentityError::IncompleteIdentity { .. })));
    }

    #[tokio::test]
    async fn upstream_failure_is_transient() {
        let provider = GithubProvider::new(FakeClient {
            profile: Err(IdentityError::Transient { message: "timeout".to_string() }),
        });

        let result = provider.normalize(GithubPayload { access_token: "tok".to_string() }).await;
        assert!(matches!(result, Err(IdentityError::Transient { .. })));
    }
}
