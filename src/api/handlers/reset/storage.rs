//! Database helpers for recovery tokens, the email outbox, and reset audit.

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::ResetConfig;
use super::utils::{build_recovery_url, generate_recovery_token, hash_recovery_token};

/// Look up an active student account by normalized email.
pub(super) async fn lookup_student_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>> {
    let query = "SELECT id FROM student_profiles WHERE email = $1 AND active";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup student by email")?;

    Ok(row.map(|row| row.get("id")))
}

/// Mint a recovery token pair, store their hashes, and enqueue the email.
///
/// Runs in one transaction so a link is never emailed without its hashes
/// being stored, and hashes never outlive a failed enqueue.
pub(super) async fn insert_recovery_records(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    config: &ResetConfig,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin recovery transaction")?;

    // Raw tokens only travel inside the emailed link; the database sees hashes.
    let access_token = generate_recovery_token()?;
    let refresh_token = generate_recovery_token()?;
    let access_hash = hash_recovery_token(&access_token);
    let refresh_hash = hash_recovery_token(&refresh_token);

    let query = r"
        INSERT INTO recovery_tokens
            (user_id, access_token_hash, refresh_token_hash, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(access_hash)
        .bind(refresh_hash)
        .bind(config.recovery_token_ttl_seconds())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert recovery token")?;

    let recovery_url = build_recovery_url(config.site_base_url(), &access_token, &refresh_token);
    enqueue_reset_email(&mut tx, email, &recovery_url).await?;

    tx.commit().await.context("commit recovery transaction")?;

    Ok(())
}

/// Enqueue a reset email carrying an already-minted recovery link.
pub(super) async fn enqueue_provider_link_email(
    pool: &PgPool,
    email: &str,
    recovery_url: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin outbox transaction")?;
    enqueue_reset_email(&mut tx, email, recovery_url).await?;
    tx.commit().await.context("commit outbox transaction")?;
    Ok(())
}

async fn enqueue_reset_email(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
    recovery_url: &str,
) -> Result<()> {
    let payload_json = json!({
        "email": email,
        "recovery_url": recovery_url,
    });
    let payload_text =
        serde_json::to_string(&payload_json).context("failed to serialize email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind("password_reset")
        .bind(payload_text)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert email outbox row")?;

    Ok(())
}

/// Record a reset attempt for audit, keyed by email and source IP.
pub(super) async fn record_reset_request(
    pool: &PgPool,
    email: &str,
    client_ip: Option<&str>,
) -> Result<()> {
    let ip: Option<IpNetwork> = client_ip.and_then(|ip| ip.parse().ok());

    let query = r"
        INSERT INTO password_reset_requests (email, client_ip)
        VALUES ($1, $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(ip)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record reset request")?;

    Ok(())
}
