//! User-facing error taxonomy for the auth lifecycle.
//!
//! Every branch of the lifecycle resolves to one of these kinds at the call
//! site nearest the user action; nothing propagates past a page as an
//! unhandled failure.

use crate::provider::ProviderError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Sign-in failed. Always generic: unknown-email and wrong-password are
    /// indistinguishable to prevent account enumeration.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The recovery link is expired, revoked, or malformed.
    #[error("recovery link expired or invalid")]
    RecoveryLinkInvalid,

    /// Too many reset requests; the caller shows a "try again later" message.
    #[error("too many requests, try again later")]
    RateLimited,

    /// The identity exists but has no business profile. Non-fatal: pages show
    /// a "contact administrator" state.
    #[error("profile not found")]
    ProfileNotFound,

    /// A provider call exceeded its deadline.
    #[error("provider call timed out")]
    Timeout,

    /// Any other provider or transport failure.
    #[error("provider failure: {0}")]
    Provider(String),
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredentials => Self::InvalidCredentials,
            ProviderError::InvalidToken => Self::RecoveryLinkInvalid,
            ProviderError::RateLimited => Self::RateLimited,
            ProviderError::Transport(message) => Self::Provider(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_auth_kinds() {
        assert_eq!(
            AuthError::from(ProviderError::InvalidCredentials),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            AuthError::from(ProviderError::RateLimited),
            AuthError::RateLimited
        );
        assert_eq!(
            AuthError::from(ProviderError::InvalidToken),
            AuthError::RecoveryLinkInvalid
        );
        assert!(matches!(
            AuthError::from(ProviderError::Transport("boom".to_string())),
            AuthError::Provider(_)
        ));
    }

    #[test]
    fn invalid_credentials_message_is_generic() {
        // The message must not hint at which part of the credentials failed.
        let message = AuthError::InvalidCredentials.to_string();
        assert!(!message.contains("email"));
        assert!(!message.contains("password"));
    }
}
