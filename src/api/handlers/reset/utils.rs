//! Helpers for reset validation and recovery token handling.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Create a new recovery token for email links.
///
/// Returned token is only sent to the user; we store a hash in the database.
pub(super) fn generate_recovery_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate recovery token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a recovery token so we never store the raw token in the database.
pub(super) fn hash_recovery_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the portal recovery link included in outbound emails.
///
/// The hash-in-hash shape is required by the portal's fragment router: the
/// first `#` carries the route, the second the token pair.
pub(super) fn build_recovery_url(
    site_base_url: &str,
    access_token: &str,
    refresh_token: &str,
) -> String {
    let base = site_base_url.trim_end_matches('/');
    format!(
        "{base}/#/alterar-senha#access_token={access_token}&refresh_token={refresh_token}&type=recovery"
    )
}

/// Extract a client IP for rate limiting from common proxy headers.
pub(super) fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
