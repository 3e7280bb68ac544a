//! # Treina (Portal Session Lifecycle & Password Recovery)
//!
//! `treina` owns the authentication lifecycle of the Treina learning portal:
//! the process-wide session store, the password-recovery handshake, and the
//! redirect guard that routes recovery links to the password-change page. It
//! also serves the serverless-style reset endpoints that generate and email
//! recovery links.
//!
//! ## Session Model
//!
//! A session is a bearer credential pair (access + refresh) owned by the
//! [`session::SessionStore`] for the lifetime of a portal tab. The store is a
//! single-writer, many-reader container: pages only ever observe a consistent
//! `(session, profile)` pair, and the profile is fetched strictly after the
//! session is written.
//!
//! ## Recovery Grants
//!
//! Recovery links carry a one-time token pair in the URL fragment:
//!
//! ```text
//! <origin>/#/alterar-senha#access_token=...&refresh_token=...&type=recovery
//! ```
//!
//! The hash-in-hash shape is a byproduct of the portal's fragment router and
//! is preserved exactly for compatibility with already-sent emails. A grant
//! is staged in tab-scoped ephemeral storage, authorizes exactly one password
//! change, and is never promoted to a persistent session.
//!
//! ## Reset Endpoints
//!
//! `POST /v1/auth/send-password-reset` asks the identity provider to mint the
//! recovery link; `POST /v1/auth/send-password-reset-email` mints its own
//! token pair and emails it directly. Both are limited to 5 requests per hour
//! per source IP and never reveal whether an email address exists.

pub mod api;
pub mod cli;
pub mod guard;
pub mod provider;
pub mod recovery;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
