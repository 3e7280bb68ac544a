//! Identity provider capability.
//!
//! The portal never implements authentication itself; it consumes an external
//! identity provider through this trait. Session/recovery logic depends only
//! on the capability, so tests can script provider behavior without network
//! access, and the HTTP client stays in [`http`].

mod functions;
mod http;

pub use functions::FunctionsClient;
pub use http::HttpIdentityProvider;

use async_trait::async_trait;

/// Opaque subject owned by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Bearer credential pair plus expiry, as issued by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_unix: i64,
    pub user: Identity,
}

/// Provider-side failures, classified as coarsely as the callers need.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("rate limited")]
    RateLimited,
    #[error("provider transport failure: {0}")]
    Transport(String),
}

/// Capability surface of the external identity provider.
///
/// `generate_recovery_link` is a server-side-only operation; it requires the
/// service key and must never be reachable from portal pages.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError>;

    /// Provider-held session for this tab, if any. `Ok(None)` means no
    /// session, not a failure.
    async fn get_session(&self) -> Result<Option<ProviderSession>, ProviderError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// Resolve the identity behind an access token ("who am I").
    async fn get_user_by_token(&self, access_token: &str) -> Result<Identity, ProviderError>;

    /// Exchange a token pair for a live session (recovery-grant consumption).
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ProviderSession, ProviderError>;

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), ProviderError>;

    /// Mint a recovery link for `email` (server-side only).
    async fn generate_recovery_link(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<String, ProviderError>;
}
