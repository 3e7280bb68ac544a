//! Client for the serverless reset functions.
//!
//! Pages request password resets through these functions rather than the
//! provider SDK, so the service key never reaches the portal and the reset
//! rate limit applies uniformly.

use crate::APP_USER_AGENT;
use crate::session::AuthError;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct FunctionsClient {
    client: Client,
    base_url: String,
}

impl FunctionsClient {
    /// Build a functions client for the given base URL.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DEFAULT_CALL_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the reset function to email a recovery link.
    ///
    /// # Errors
    /// Returns `AuthError::RateLimited` on HTTP 429 so the caller can show a
    /// "try again later" message; other failures collapse into
    /// `AuthError::Provider`.
    pub async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut body = json!({ "email": email });
        if let Some(redirect_to) = redirect_to {
            body["redirect_to"] = json!(redirect_to);
        }

        let response = self
            .client
            .post(format!("{}/v1/auth/send-password-reset", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| AuthError::Provider(err.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS => Err(AuthError::RateLimited),
            status => Err(AuthError::Provider(format!(
                "reset function failed: {status}"
            ))),
        }
    }
}
