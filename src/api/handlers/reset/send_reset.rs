//! Reset endpoint backed by the identity provider's link minting.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use crate::provider::IdentityProvider;

use super::ResetState;
use super::rate_limit::RateLimitDecision;
use super::storage::{enqueue_provider_link_email, record_reset_request};
use super::types::{SendResetRequest, SendResetResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};

/// Ask the identity provider to mint a recovery link and email it.
///
/// The success body is identical whether or not the email has an account;
/// only the rate limit is allowed to distinguish callers.
#[utoipa::path(
    post,
    path = "/v1/auth/send-password-reset",
    request_body = SendResetRequest,
    responses(
        (status = 200, description = "Accepted (opaque)", body = SendResetResponse),
        (status = 400, description = "Missing payload", body = SendResetResponse),
        (status = 429, description = "Rate limited", body = SendResetResponse)
    ),
    tag = "auth"
)]
pub async fn send_reset(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    reset_state: Extension<Arc<ResetState>>,
    provider: Extension<Arc<dyn IdentityProvider>>,
    payload: Option<Json<SendResetRequest>>,
) -> impl IntoResponse {
    let request: SendResetRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SendResetResponse::error("Missing payload")),
            )
                .into_response();
        }
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        // Always accept invalid emails to avoid account probing.
        return (StatusCode::OK, Json(SendResetResponse::accepted())).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if reset_state.rate_limiter().check_ip(client_ip.as_deref()) == RateLimitDecision::Limited {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(SendResetResponse::error("Rate limited")),
        )
            .into_response();
    }

    if let Err(err) = record_reset_request(&pool, &email, client_ip.as_deref()).await {
        // Audit failures never block the reset itself.
        warn!("failed to record reset request: {err}");
    }

    let link = match provider
        .generate_recovery_link(&email, request.redirect_to.as_deref())
        .await
    {
        Ok(link) => link,
        Err(err) => {
            // Unknown email or provider trouble, both opaque to the caller.
            warn!("provider did not mint a recovery link: {err}");
            return (StatusCode::OK, Json(SendResetResponse::accepted())).into_response();
        }
    };

    if let Err(err) = enqueue_provider_link_email(&pool, &email, &link).await {
        error!("failed to enqueue reset email: {err}");
    }

    (StatusCode::OK, Json(SendResetResponse::accepted())).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::SlidingWindowLimiter;
    use super::super::{ResetConfig, ResetState};
    use super::{SendResetRequest, send_reset};
    use crate::provider::{Identity, IdentityProvider, ProviderError, ProviderSession};
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;

    struct StubProvider;

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<ProviderSession, ProviderError> {
            Err(ProviderError::InvalidCredentials)
        }

        async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError> {
            Ok(None)
        }

        async fn sign_out(&self, _token: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn get_user_by_token(&self, _token: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::InvalidToken)
        }

        async fn set_session(
            &self,
            _access: &str,
            _refresh: &str,
        ) -> Result<ProviderSession, ProviderError> {
            Err(ProviderError::InvalidToken)
        }

        async fn update_password(
            &self,
            _token: &str,
            _password: &str,
        ) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn generate_recovery_link(
            &self,
            _email: &str,
            _redirect_to: Option<&str>,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Transport("not wired in tests".to_string()))
        }
    }

    fn reset_state(max_per_window: u32) -> Arc<ResetState> {
        let config = ResetConfig::new("https://portal.treina.app".to_string());
        let limiter = Arc::new(SlidingWindowLimiter::new(
            Duration::from_secs(3600),
            max_per_window,
        ));
        Arc::new(ResetState::new(config, limiter))
    }

    fn provider() -> Arc<dyn IdentityProvider> {
        Arc::new(StubProvider)
    }

    #[tokio::test]
    async fn send_reset_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_reset(
            HeaderMap::new(),
            Extension(pool),
            Extension(reset_state(5)),
            Extension(provider()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn send_reset_invalid_email_is_opaque_success() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_reset(
            HeaderMap::new(),
            Extension(pool),
            Extension(reset_state(5)),
            Extension(provider()),
            Some(Json(SendResetRequest {
                email: "not-an-email".to_string(),
                redirect_to: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn send_reset_unknown_email_is_opaque_success() -> Result<()> {
        // The stub refuses to mint a link, exactly as the provider does for
        // an email without an account. The caller still sees the success
        // body and no message is enqueued.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        let response = send_reset(
            headers,
            Extension(pool),
            Extension(reset_state(5)),
            Extension(provider()),
            Some(Json(SendResetRequest {
                email: "ninguem@treina.app".to_string(),
                redirect_to: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let parsed: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(parsed["success"], serde_json::Value::Bool(true));
        Ok(())
    }

    #[tokio::test]
    async fn send_reset_rate_limited_returns_429() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        let response = send_reset(
            headers,
            Extension(pool),
            Extension(reset_state(0)),
            Extension(provider()),
            Some(Json(SendResetRequest {
                email: "ana@treina.app".to_string(),
                redirect_to: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }
}
