//! One-time consumption of a staged recovery grant.
//!
//! The staged pair buys a bounded-lifetime session scoped to a single
//! password mutation: exchange tokens, update the credential, invalidate the
//! temporary session, clear staging, and send the user back to login.

use crate::provider::IdentityProvider;
use crate::session::{AuthError, LOGIN_PATH, Navigator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::RecoveryStaging;

const LOGIN_REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub struct PasswordChange {
    provider: Arc<dyn IdentityProvider>,
    staging: RecoveryStaging,
    navigator: Arc<dyn Navigator>,
    redirect_delay: Duration,
}

impl PasswordChange {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        staging: RecoveryStaging,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            provider,
            staging,
            navigator,
            redirect_delay: LOGIN_REDIRECT_DELAY,
        }
    }

    #[must_use]
    pub fn with_redirect_delay(mut self, redirect_delay: Duration) -> Self {
        self.redirect_delay = redirect_delay;
        self
    }

    /// Consume the staged grant and set a new password.
    ///
    /// On success the staging keys are removed, the temporary session is
    /// invalidated, and the user is redirected to login after a short delay.
    /// On failure staging is left intact so the user can retry, except when
    /// the grant itself is rejected, which clears it.
    ///
    /// # Errors
    /// `AuthError::RecoveryLinkInvalid` when no grant is staged or the grant
    /// is rejected by the provider; other provider failures map through
    /// [`AuthError`].
    pub async fn submit(&self, new_password: &str) -> Result<(), AuthError> {
        let Some(grant) = self.staging.peek() else {
            return Err(AuthError::RecoveryLinkInvalid);
        };

        // The grant buys one temporary session, never a persistent one.
        let session = match self
            .provider
            .set_session(&grant.access_token, &grant.refresh_token)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                warn!("recovery grant rejected at consumption: {err}");
                let mapped = AuthError::from(err);
                if mapped == AuthError::RecoveryLinkInvalid {
                    // A dead grant can never succeed on retry.
                    self.staging.clear();
                }
                return Err(mapped);
            }
        };

        self.provider
            .update_password(&session.access_token, new_password)
            .await
            .map_err(AuthError::from)?;

        info!("password updated for subject {}", session.user.id);

        // Invalidate the temporary session; failure here is non-fatal since
        // the credential mutation already landed.
        if let Err(err) = self.provider.sign_out(&session.access_token).await {
            warn!("failed to invalidate recovery session: {err}");
        }

        self.staging.clear();

        sleep(self.redirect_delay).await;
        self.navigator.assign(LOGIN_PATH);
        Ok(())
    }
}
