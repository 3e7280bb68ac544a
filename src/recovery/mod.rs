//! Recovery handshake: detect a password-recovery link, validate it against
//! the identity provider, and stage it for one-time use.
//!
//! The handshake is a small state machine:
//!
//! ```text
//! NoToken -> TokenDetected -> Valid (tokens staged, terminal)
//!                          -> Invalid (notice + redirect, terminal)
//! ```
//!
//! Token validation runs under an explicit deadline; a hung provider call
//! resolves to `Invalid` instead of leaving the page stuck with no outcome.

pub mod fragment;
pub mod staging;

mod password_change;

pub use password_change::PasswordChange;
pub use staging::{RecoveryStaging, StagedGrant};

use crate::provider::IdentityProvider;
use crate::session::AuthError;
use fragment::FragmentShape;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Where users go to request a fresh recovery link.
pub const REQUEST_NEW_LINK_PATH: &str = "/recuperar-senha";

const VALIDATION_TIMEOUT: Duration = Duration::from_secs(8);

/// States of the handshake. `Valid` and `Invalid` are terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    NoToken,
    TokenDetected,
    Valid,
    Invalid,
}

/// Terminal outcome handed to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// No recovery credentials in the URL; render normally.
    NoToken,
    /// Grant validated and staged; the password-change form takes over.
    Valid,
    /// Link expired, revoked, malformed, or validation timed out. The page
    /// shows the notice and redirects to [`REQUEST_NEW_LINK_PATH`].
    Invalid {
        notice: AuthError,
        redirect_to: &'static str,
    },
}

pub struct RecoveryHandshake {
    provider: Arc<dyn IdentityProvider>,
    staging: RecoveryStaging,
    validation_timeout: Duration,
}

impl RecoveryHandshake {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, staging: RecoveryStaging) -> Self {
        Self {
            provider,
            staging,
            validation_timeout: VALIDATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_validation_timeout(mut self, validation_timeout: Duration) -> Self {
        self.validation_timeout = validation_timeout;
        self
    }

    /// Run the handshake against the current URL fragment.
    ///
    /// Tokens are staged only after the provider confirms the access token is
    /// live; an invalid or expired grant never reaches staging.
    pub async fn run(&self, url_fragment: &str) -> HandshakeOutcome {
        match fragment::classify(url_fragment) {
            FragmentShape::NotRecovery => HandshakeOutcome::NoToken,
            FragmentShape::Malformed => {
                warn!("malformed recovery fragment; treating as invalid link");
                self.invalid(AuthError::RecoveryLinkInvalid)
            }
            FragmentShape::Tokens {
                access_token,
                refresh_token,
            } => self.validate_and_stage(&access_token, &refresh_token).await,
        }
    }

    async fn validate_and_stage(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> HandshakeOutcome {
        // TokenDetected: confirm the token still resolves to an identity.
        let who_am_i = timeout(
            self.validation_timeout,
            self.provider.get_user_by_token(access_token),
        )
        .await;

        match who_am_i {
            Ok(Ok(identity)) => {
                info!("recovery grant validated for subject {}", identity.id);
                self.staging.stage(access_token, refresh_token);
                HandshakeOutcome::Valid
            }
            Ok(Err(err)) => {
                warn!("recovery token rejected by provider: {err}");
                self.invalid(AuthError::RecoveryLinkInvalid)
            }
            Err(_elapsed) => {
                warn!("recovery token validation timed out");
                self.invalid(AuthError::Timeout)
            }
        }
    }

    fn invalid(&self, notice: AuthError) -> HandshakeOutcome {
        HandshakeOutcome::Invalid {
            notice,
            redirect_to: REQUEST_NEW_LINK_PATH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Identity, ProviderError, ProviderSession};
    use async_trait::async_trait;

    struct TokenProvider {
        accept_token: Option<String>,
        hang: bool,
    }

    #[async_trait]
    impl IdentityProvider for TokenProvider {
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

        async fn get_user_by_token(&self, token: &str) -> Result<Identity, ProviderError> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            match &self.accept_token {
                Some(accepted) if accepted == token => Ok(Identity {
                    id: "user-1".to_string(),
                    email: "ana@treina.app".to_string(),
                }),
                _ => Err(ProviderError::InvalidToken),
            }
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
            Err(ProviderError::Transport("not used".to_string()))
        }
    }

    fn handshake(provider: TokenProvider) -> (RecoveryHandshake, RecoveryStaging) {
        let staging = RecoveryStaging::in_memory();
        let handshake = RecoveryHandshake::new(Arc::new(provider), staging.clone());
        (handshake, staging)
    }

    #[tokio::test]
    async fn valid_grant_stages_exactly_the_token_pair() {
        let (handshake, staging) = handshake(TokenProvider {
            accept_token: Some("abc".to_string()),
            hang: false,
        });

        let outcome = handshake
            .run("#access_token=abc&refresh_token=def&type=recovery")
            .await;

        assert_eq!(outcome, HandshakeOutcome::Valid);
        assert_eq!(
            staging.peek(),
            Some(StagedGrant {
                access_token: "abc".to_string(),
                refresh_token: "def".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn expired_token_is_invalid_and_stages_nothing() {
        let (handshake, staging) = handshake(TokenProvider {
            accept_token: None,
            hang: false,
        });

        let outcome = handshake
            .run("#access_token=expired&refresh_token=def&type=recovery")
            .await;

        assert_eq!(
            outcome,
            HandshakeOutcome::Invalid {
                notice: AuthError::RecoveryLinkInvalid,
                redirect_to: REQUEST_NEW_LINK_PATH,
            }
        );
        assert!(staging.peek().is_none());
    }

    #[tokio::test]
    async fn malformed_recovery_fragment_is_invalid() {
        let (handshake, staging) = handshake(TokenProvider {
            accept_token: Some("abc".to_string()),
            hang: false,
        });

        let outcome = handshake.run("#/curso/recovery-basics").await;

        assert!(matches!(outcome, HandshakeOutcome::Invalid { .. }));
        assert!(staging.peek().is_none());
    }

    #[tokio::test]
    async fn non_recovery_fragment_is_no_token() {
        let (handshake, _) = handshake(TokenProvider {
            accept_token: None,
            hang: false,
        });
        assert_eq!(handshake.run("#/dashboard").await, HandshakeOutcome::NoToken);
    }

    #[tokio::test]
    async fn hung_validation_resolves_to_invalid() {
        let (handshake, staging) = handshake(TokenProvider {
            accept_token: Some("abc".to_string()),
            hang: true,
        });
        let handshake = handshake.with_validation_timeout(Duration::from_millis(20));

        let outcome = handshake
            .run("#access_token=abc&refresh_token=def&type=recovery")
            .await;

        assert_eq!(
            outcome,
            HandshakeOutcome::Invalid {
                notice: AuthError::Timeout,
                redirect_to: REQUEST_NEW_LINK_PATH,
            }
        );
        assert!(staging.peek().is_none());
    }
}
