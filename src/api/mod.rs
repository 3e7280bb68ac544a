use crate::{
    api::handlers::{health, reset, root},
    cli::globals::GlobalArgs,
    provider::{HttpIdentityProvider, IdentityProvider},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, options},
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod email;
pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    globals: &GlobalArgs,
    reset_config: reset::ResetConfig,
    email_config: email::EmailWorkerConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let provider: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(globals)?);

    let limiter = Arc::new(reset::rate_limit::SlidingWindowLimiter::new(
        reset_config.window(),
        reset_config.max_per_window(),
    ));
    let reset_state = Arc::new(reset::ResetState::new(reset_config, limiter));

    // Background worker polls email_outbox (DB-backed queue) for pending rows,
    // delivers them through the mail API, and retries failures with backoff.
    let sender: Arc<dyn email::EmailSender> = if globals.mail_api_key.expose_secret().is_empty() {
        Arc::new(email::LogEmailSender)
    } else {
        Arc::new(email::MailApiSender::new(
            globals.mail_api_url.clone(),
            globals.mail_api_key.clone(),
        )?)
    };
    email::spawn_outbox_worker(pool.clone(), sender, email_config);

    let portal_origin = portal_origin(&globals.site_base_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(portal_origin))
        .allow_credentials(true);

    // Build the router from OpenAPI-wired routes, then extend it with non-doc
    // routes like `/` and preflight-only `OPTIONS /health`.
    let (router, _openapi) = router().split_for_parts();
    let app = router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(reset_state.clone()))
                .layer(Extension(provider.clone()))
                .layer(Extension(globals.clone()))
                .layer(Extension(pool.clone())),
        )
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn portal_origin(site_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(site_base_url)
        .with_context(|| format!("Invalid site base URL: {site_base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Site base URL must include a valid host: {site_base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build portal origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_origin_strips_path_and_fragment() -> Result<()> {
        let origin = portal_origin("https://portal.treina.app/#/login")?;
        assert_eq!(origin, HeaderValue::from_static("https://portal.treina.app"));
        Ok(())
    }

    #[test]
    fn portal_origin_keeps_explicit_port() -> Result<()> {
        let origin = portal_origin("http://localhost:5173")?;
        assert_eq!(origin, HeaderValue::from_static("http://localhost:5173"));
        Ok(())
    }

    #[test]
    fn portal_origin_rejects_garbage() {
        assert!(portal_origin("not a url").is_err());
    }
}
