//! End-to-end recovery flow against the public crate API.
//!
//! Drives the path a real recovery email takes through the portal: the
//! redirect guard forces the tab onto the password-change page, the handshake
//! validates and stages the token pair, and the password change consumes the
//! grant exactly once.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use treina::guard::{self, GuardDecision, PASSWORD_CHANGE_PATH};
use treina::provider::{Identity, IdentityProvider, ProviderError, ProviderSession};
use treina::recovery::{
    HandshakeOutcome, PasswordChange, REQUEST_NEW_LINK_PATH, RecoveryHandshake, RecoveryStaging,
};
use treina::session::Navigator;

struct RecoveryProvider {
    valid_access_token: String,
    password_updates: Mutex<Vec<String>>,
}

impl RecoveryProvider {
    fn new(valid_access_token: &str) -> Self {
        Self {
            valid_access_token: valid_access_token.to_string(),
            password_updates: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IdentityProvider for RecoveryProvider {
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
        if token == self.valid_access_token {
            Ok(Identity {
                id: "user-1".to_string(),
                email: "ana@treina.app".to_string(),
            })
        } else {
            Err(ProviderError::InvalidToken)
        }
    }

    async fn set_session(
        &self,
        access: &str,
        refresh: &str,
    ) -> Result<ProviderSession, ProviderError> {
        if access != self.valid_access_token {
            return Err(ProviderError::InvalidToken);
        }
        Ok(ProviderSession {
            access_token: format!("live-{access}"),
            refresh_token: refresh.to_string(),
            expires_at_unix: 4_102_444_800,
            user: Identity {
                id: "user-1".to_string(),
                email: "ana@treina.app".to_string(),
            },
        })
    }

    async fn update_password(&self, _token: &str, password: &str) -> Result<(), ProviderError> {
        self.password_updates
            .lock()
            .unwrap()
            .push(password.to_string());
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

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn assign(&self, url: &str) {
        self.visits.lock().unwrap().push(url.to_string());
    }
}

const RECOVERY_FRAGMENT: &str = "#/alterar-senha#access_token=abc&refresh_token=def&type=recovery";

#[tokio::test]
async fn recovery_link_redirects_validates_and_changes_password() {
    // 1. The recovery link lands on the root route with tokens in the fragment.
    let decision = guard::evaluate("/", RECOVERY_FRAGMENT);
    let target = match decision {
        GuardDecision::HardRedirect(target) => target,
        GuardDecision::Stay => panic!("recovery link must redirect"),
    };
    assert!(target.starts_with(PASSWORD_CHANGE_PATH));
    assert!(target.contains("access_token=abc"));

    // 2. The password-change page validates and stages the grant.
    let provider = Arc::new(RecoveryProvider::new("abc"));
    let staging = RecoveryStaging::in_memory();
    let handshake = RecoveryHandshake::new(provider.clone(), staging.clone());

    let fragment = target.split_once('#').map(|(_, f)| f).unwrap_or_default();
    assert_eq!(handshake.run(fragment).await, HandshakeOutcome::Valid);
    assert!(staging.has_grant());

    // Once redirected, re-running the guard on the target page is a no-op.
    assert_eq!(
        guard::evaluate(PASSWORD_CHANGE_PATH, &format!("#{fragment}")),
        GuardDecision::Stay
    );

    // 3. Submitting the form consumes the grant and redirects to login.
    let navigator = Arc::new(RecordingNavigator::default());
    let change = PasswordChange::new(provider.clone(), staging.clone(), navigator.clone())
        .with_redirect_delay(Duration::from_millis(1));
    change
        .submit("NovaSenhaForte1")
        .await
        .expect("password change succeeds");

    assert_eq!(
        provider.password_updates.lock().unwrap().as_slice(),
        &["NovaSenhaForte1".to_string()]
    );
    assert!(!staging.has_grant());
    assert_eq!(
        navigator.visits.lock().unwrap().as_slice(),
        &["/login".to_string()]
    );
}

#[tokio::test]
async fn expired_link_resolves_to_invalid_and_requests_new_link() {
    let provider = Arc::new(RecoveryProvider::new("some-other-token"));
    let staging = RecoveryStaging::in_memory();
    let handshake = RecoveryHandshake::new(provider, staging.clone());

    let outcome = handshake
        .run("#access_token=expired&refresh_token=def&type=recovery")
        .await;

    match outcome {
        HandshakeOutcome::Invalid { redirect_to, .. } => {
            assert_eq!(redirect_to, REQUEST_NEW_LINK_PATH);
        }
        other => panic!("expected invalid outcome, got {other:?}"),
    }
    assert!(!staging.has_grant());
}

#[tokio::test]
async fn tokens_on_an_unrelated_route_still_reach_password_change() {
    // Markers attached to a deep route must not render that route.
    let decision = guard::evaluate(
        "/curso/42",
        "#access_token=abc&refresh_token=def&type=recovery",
    );
    assert_eq!(
        decision,
        GuardDecision::HardRedirect(
            "/alterar-senha#access_token=abc&refresh_token=def&type=recovery".to_string()
        )
    );
}
