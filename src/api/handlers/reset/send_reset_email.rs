//! Reset endpoint that mints its own recovery token pair.
//!
//! Used when the identity provider's link minting is unavailable or when the
//! deployment prefers to own the email template end to end. The recovery URL
//! has the same hash-in-hash shape either way, so the portal's redirect guard
//! and handshake treat both links identically.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::ResetState;
use super::rate_limit::RateLimitDecision;
use super::storage::{insert_recovery_records, lookup_student_by_email, record_reset_request};
use super::types::{SendResetRequest, SendResetResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};

/// Mint a recovery token pair, store the hashes, and email the link.
#[utoipa::path(
    post,
    path = "/v1/auth/send-password-reset-email",
    request_body = SendResetRequest,
    responses(
        (status = 200, description = "Accepted (opaque)", body = SendResetResponse),
        (status = 400, description = "Missing payload", body = SendResetResponse),
        (status = 429, description = "Rate limited", body = SendResetResponse)
    ),
    tag = "auth"
)]
pub async fn send_reset_email(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    reset_state: Extension<Arc<ResetState>>,
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
        warn!("failed to record reset request: {err}");
    }

    let user_id = match lookup_student_by_email(&pool, &email).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            // Unknown email: same body, no email sent.
            return (StatusCode::OK, Json(SendResetResponse::accepted())).into_response();
        }
        Err(err) => {
            error!("failed to lookup account for reset: {err}");
            return (StatusCode::OK, Json(SendResetResponse::accepted())).into_response();
        }
    };

    if let Err(err) = insert_recovery_records(&pool, user_id, &email, reset_state.config()).await {
        error!("failed to stage recovery email: {err}");
    }

    (StatusCode::OK, Json(SendResetResponse::accepted())).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::SlidingWindowLimiter;
    use super::super::{ResetConfig, ResetState};
    use super::{SendResetRequest, send_reset_email};
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;

    fn reset_state(max_per_window: u32) -> Arc<ResetState> {
        let config = ResetConfig::new("https://portal.treina.app".to_string());
        let limiter = Arc::new(SlidingWindowLimiter::new(
            Duration::from_secs(3600),
            max_per_window,
        ));
        Arc::new(ResetState::new(config, limiter))
    }

    #[tokio::test]
    async fn send_reset_email_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_reset_email(
            HeaderMap::new(),
            Extension(pool),
            Extension(reset_state(5)),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn send_reset_email_invalid_email_is_opaque_success() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_reset_email(
            HeaderMap::new(),
            Extension(pool),
            Extension(reset_state(5)),
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
    async fn send_reset_email_failed_lookup_is_opaque_success() -> Result<()> {
        // The lazy pool has no database behind it, so the account lookup
        // fails; the caller still sees the success body and nothing is
        // enqueued, same as for an email without an account.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        let response = send_reset_email(
            headers,
            Extension(pool),
            Extension(reset_state(5)),
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
    async fn send_reset_email_rate_limited_returns_429() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        let response = send_reset_email(
            headers,
            Extension(pool),
            Extension(reset_state(0)),
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
