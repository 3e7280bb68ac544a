//! Redirect guard: a tab that arrives with recovery tokens always lands on
//! the password-change page, even when the tokens are attached to an
//! unrelated route.
//!
//! The guard runs on initial mount and on every fragment change (recovery
//! tokens live in the fragment, which does not trigger a full navigation).
//! When it fires, it forces a full-page navigation rather than an in-app
//! route change: the target page's own token validation must re-run against
//! a fresh page load, and the fragment must survive byte-for-byte.

use crate::recovery::fragment;
use crate::session::{LOGIN_PATH, Navigator, SessionStore};
use std::sync::Arc;
use tracing::debug;

pub const PASSWORD_CHANGE_PATH: &str = "/alterar-senha";
pub const DASHBOARD_PATH: &str = "/dashboard";

const ACCESS_TOKEN_MARKER: &str = "access_token";
const RECOVERY_MARKER: &str = "type=recovery";

/// What the guard decided for the current URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// No recognizable token shape, or already on the target page.
    Stay,
    /// Force a full-page navigation to this URL.
    HardRedirect(String),
}

/// Decide whether `(path, fragment)` must be redirected to the
/// password-change page. Pure; never blocks normal navigation.
#[must_use]
pub fn evaluate(path: &str, url_fragment: &str) -> GuardDecision {
    let tokens = fragment::token_part(url_fragment.trim_start_matches('#'));

    if !tokens.contains(RECOVERY_MARKER) || !tokens.contains(ACCESS_TOKEN_MARKER) {
        return GuardDecision::Stay;
    }
    if path == PASSWORD_CHANGE_PATH {
        return GuardDecision::Stay;
    }

    // Preserve the fragment exactly; the target page re-parses it.
    GuardDecision::HardRedirect(format!("{PASSWORD_CHANGE_PATH}#{tokens}"))
}

/// Runs guard decisions against a navigator, plus the authenticated-redirect
/// branch that is gated on session readiness.
pub struct RedirectGuard {
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl RedirectGuard {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Fragment-change hook: recovery redirects only.
    pub fn on_fragment_change(&self, path: &str, url_fragment: &str) {
        if let GuardDecision::HardRedirect(target) = evaluate(path, url_fragment) {
            debug!("forcing navigation to password-change page");
            self.navigator.assign(&target);
        }
    }

    /// Mount hook: recovery redirect first, then the authenticated branch.
    ///
    /// The authenticated branch acts only after the session store's readiness
    /// barrier resolves, so it can never observe a half-bootstrapped session.
    pub async fn on_load(&self, path: &str, url_fragment: &str) {
        if let GuardDecision::HardRedirect(target) = evaluate(path, url_fragment) {
            debug!("forcing navigation to password-change page");
            self.navigator.assign(&target);
            return;
        }

        self.store.wait_ready().await;
        let snapshot = self.store.snapshot().await;
        if snapshot.session.is_some() && path == LOGIN_PATH {
            self.navigator.assign(DASHBOARD_PATH);
        }
    }
}
