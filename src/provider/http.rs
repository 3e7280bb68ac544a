//! HTTP client for the identity provider API.
//!
//! The provider exposes a small JSON surface: password grant, logout, user
//! lookup by bearer token, password update, refresh-token exchange, and an
//! admin endpoint that mints recovery links. Every call carries the crate
//! user agent and a bounded timeout so a hung provider can never wedge the
//! caller.

use crate::APP_USER_AGENT;
use crate::cli::globals::GlobalArgs;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::error;

use super::{Identity, IdentityProvider, ProviderError, ProviderSession};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct TokenGrantResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    user: UserResponse,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: String,
}

#[derive(Deserialize)]
struct GenerateLinkResponse {
    action_link: String,
}

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    /// Build a provider client from global configuration.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(globals: &GlobalArgs) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_CALL_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: globals.provider_url.trim_end_matches('/').to_string(),
            service_key: globals.provider_service_key.expose_secret().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn classify_status(status: StatusCode) -> ProviderError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::InvalidToken,
            StatusCode::BAD_REQUEST => ProviderError::InvalidCredentials,
            status => ProviderError::Transport(format!("unexpected status: {status}")),
        }
    }

    fn transport(err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            return ProviderError::Transport("timeout".to_string());
        }
        ProviderError::Transport(err.to_string())
    }
}

fn session_from_grant(grant: TokenGrantResponse) -> ProviderSession {
    ProviderSession {
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_at_unix: grant.expires_at,
        user: Identity {
            id: grant.user.id,
            email: grant.user.email,
        },
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let response = self
            .client
            .post(self.url("/token?grant_type=password"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }

        let grant: TokenGrantResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(session_from_grant(grant))
    }

    async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError> {
        // The provider keeps tab sessions in its own storage; the server-side
        // client holds none, so there is never an existing session to restore.
        Ok(None)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.url("/logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        // An already-expired session is still a successful logout.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::classify_status(response.status()))
    }

    async fn get_user_by_token(&self, access_token: &str) -> Result<Identity, ProviderError> {
        let response = self
            .client
            .get(self.url("/user"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(Identity {
            id: user.id,
            email: user.email,
        })
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ProviderSession, ProviderError> {
        // Verify the access token first so a revoked grant never becomes a
        // session, then exchange the refresh token for a live pair.
        let user = self.get_user_by_token(access_token).await?;

        let response = self
            .client
            .post(self.url("/token?grant_type=refresh_token"))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }

        let grant: TokenGrantResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let mut session = session_from_grant(grant);
        // The refresh grant must belong to the same identity the access token
        // proved; mismatches mean a forged or spliced link.
        if session.user.email != user.email {
            error!("refresh grant identity mismatch; rejecting recovery session");
            return Err(ProviderError::InvalidToken);
        }
        session.user = user;
        Ok(session)
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .client
            .put(self.url("/user"))
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::classify_status(response.status()))
    }

    async fn generate_recovery_link(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut body = json!({ "type": "recovery", "email": email });
        if let Some(redirect_to) = redirect_to {
            body["redirect_to"] = json!(redirect_to);
        }

        let response = self
            .client
            .post(self.url("/admin/generate_link"))
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| Self::transport(&err))?;

        if !response.status().is_success() {
            return Err(Self::classify_status(response.status()));
        }

        let link: GenerateLinkResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(link.action_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_maps_rate_limit() {
        assert_eq!(
            HttpIdentityProvider::classify_status(StatusCode::TOO_MANY_REQUESTS),
            ProviderError::RateLimited
        );
        assert_eq!(
            HttpIdentityProvider::classify_status(StatusCode::UNAUTHORIZED),
            ProviderError::InvalidToken
        );
        assert_eq!(
            HttpIdentityProvider::classify_status(StatusCode::BAD_REQUEST),
            ProviderError::InvalidCredentials
        );
        assert!(matches!(
            HttpIdentityProvider::classify_status(StatusCode::BAD_GATEWAY),
            ProviderError::Transport(_)
        ));
    }

    #[test]
    fn session_from_grant_carries_identity() {
        let session = session_from_grant(TokenGrantResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 42,
            user: UserResponse {
                id: "id-1".to_string(),
                email: "user@treina.app".to_string(),
            },
        });
        assert_eq!(session.user.email, "user@treina.app");
        assert_eq!(session.expires_at_unix, 42);
    }
}
