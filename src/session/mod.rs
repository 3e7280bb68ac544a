//! Session store: the single source of truth for "who is logged in".
//!
//! One writer (this store), many readers (pages). Readers always observe a
//! consistent `(session, profile)` pair because the session is written before
//! the dependent profile fetch runs, and a fetched profile is discarded if
//! the session changed underneath it.
//!
//! Readiness is an explicit barrier: `initialize` resolves a watch channel
//! exactly once, success or failure, and dependents await [`SessionStore::wait_ready`]
//! instead of sleeping for a fixed delay.

mod error;
mod profile;

pub use error::AuthError;
pub use profile::{PgProfileSource, Profile, ProfileSource};

use crate::provider::{FunctionsClient, IdentityProvider, ProviderSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::sleep;
use tracing::{error, warn};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

const LOGOUT_REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Target of a forced navigation. UI shells implement this; tests record it.
pub trait Navigator: Send + Sync {
    /// Full-page navigation (not an in-app route change).
    fn assign(&self, url: &str);
}

/// Provider event channel notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Consistent view of the current session and its profile.
#[derive(Clone, Debug, Default)]
pub struct AuthSnapshot {
    pub session: Option<ProviderSession>,
    pub profile: Option<Profile>,
}

impl AuthSnapshot {
    /// Profile for the signed-in identity.
    ///
    /// # Errors
    /// `AuthError::ProfileNotFound` when an identity is signed in but has no
    /// profile record; pages show a "contact administrator" state instead of
    /// treating this as fatal. `AuthError::InvalidCredentials` when nobody is
    /// signed in.
    pub fn require_profile(&self) -> Result<&Profile, AuthError> {
        if self.session.is_none() {
            return Err(AuthError::InvalidCredentials);
        }
        self.profile.as_ref().ok_or(AuthError::ProfileNotFound)
    }
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileSource>,
    functions: FunctionsClient,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthSnapshot>,
    ready: watch::Sender<bool>,
    bootstrapped: AtomicBool,
    logout_redirect_delay: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileSource>,
        functions: FunctionsClient,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            provider,
            profiles,
            functions,
            navigator,
            state: RwLock::new(AuthSnapshot::default()),
            ready,
            bootstrapped: AtomicBool::new(false),
            logout_redirect_delay: LOGOUT_REDIRECT_DELAY,
        }
    }

    #[must_use]
    pub fn with_logout_redirect_delay(mut self, delay: Duration) -> Self {
        self.logout_redirect_delay = delay;
        self
    }

    /// Bootstrap the store from any session the provider already holds.
    ///
    /// Resolves the readiness barrier exactly once, whatever the outcome, so
    /// callers of [`Self::wait_ready`] never block indefinitely.
    pub async fn initialize(&self) {
        match self.provider.get_session().await {
            Ok(Some(session)) => {
                let email = session.user.email.clone();
                self.state.write().await.session = Some(session);
                self.fetch_profile_for(&email).await;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("session bootstrap failed: {err}");
            }
        }

        self.bootstrapped.store(true, Ordering::SeqCst);
        let _ = self.ready.send(true);
    }

    /// Wait until `initialize` has resolved, whether it found a session or not.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Current `(session, profile)` pair.
    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.read().await.clone()
    }

    /// Handle a provider event-channel notification.
    ///
    /// The session is written synchronously; the dependent profile fetch is
    /// deferred to a spawned task so this handler never blocks, and it only
    /// runs once bootstrap has finished so it cannot race the initial fetch.
    pub async fn handle_event(self: &Arc<Self>, event: AuthEvent, session: Option<ProviderSession>) {
        match event {
            AuthEvent::SignedOut => {
                let mut state = self.state.write().await;
                state.session = None;
                state.profile = None;
            }
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed => {
                let email = session.as_ref().map(|s| s.user.email.clone());
                self.state.write().await.session = session;

                if !self.bootstrapped.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(email) = email {
                    let store = Arc::clone(self);
                    tokio::spawn(async move {
                        store.fetch_profile_for(&email).await;
                    });
                }
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    /// Any provider failure collapses into `AuthError::InvalidCredentials`;
    /// the cause is never surfaced to prevent account enumeration.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|err| {
                warn!("sign-in rejected: {err}");
                AuthError::InvalidCredentials
            })?;

        let email = session.user.email.clone();
        self.state.write().await.session = Some(session);
        self.fetch_profile_for(&email).await;
        Ok(())
    }

    /// Sign out and navigate home.
    ///
    /// Local state is cleared before the network call so the UI reflects the
    /// logged-out state immediately; a failed or unnecessary provider call is
    /// logged and swallowed. The home redirect always happens.
    pub async fn sign_out(&self) {
        let access_token = {
            let mut state = self.state.write().await;
            let token = state
                .session
                .as_ref()
                .map(|session| session.access_token.clone());
            state.session = None;
            state.profile = None;
            token
        };

        match access_token {
            Some(token) => {
                if let Err(err) = self.provider.sign_out(&token).await {
                    warn!("provider sign-out failed after local cleanup: {err}");
                }
            }
            // No session is a successful logout, not an error.
            None => {}
        }

        sleep(self.logout_redirect_delay).await;
        self.navigator.assign(HOME_PATH);
    }

    /// Request a password-recovery email through the serverless function.
    ///
    /// # Errors
    /// Returns `AuthError::RateLimited` when the function reports HTTP 429 so
    /// the UI can show a specific message; other failures surface as
    /// `AuthError::Provider`.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.functions.send_password_reset(email, None).await
    }

    /// Fetch the profile for `email` and apply it only if the session still
    /// belongs to that email. Failures leave the session intact and the
    /// profile `None`.
    async fn fetch_profile_for(&self, email: &str) {
        let fetched = match self.profiles.fetch_by_email(email).await {
            Ok(profile) => profile,
            Err(err) => {
                error!("profile fetch failed for session: {err}");
                None
            }
        };

        let mut state = self.state.write().await;
        let session_email = state.session.as_ref().map(|s| s.user.email.as_str());
        if session_email == Some(email) {
            state.profile = fetched;
        }
    }
}
