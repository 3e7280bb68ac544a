//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the reset API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, provider};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let provider_opts = provider::Options::parse(matches)?;
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Box::new(Args {
        port,
        dsn,
        provider_url: provider_opts.url,
        provider_service_key: provider_opts.service_key,
        mail_api_url: provider_opts.mail_api_url,
        mail_api_key: provider_opts.mail_api_key,
        site_base_url: auth_opts.site_base_url,
        recovery_token_ttl_seconds: auth_opts.recovery_token_ttl_seconds,
        reset_window_seconds: auth_opts.reset_window_seconds,
        reset_max_per_window: auth_opts.reset_max_per_window,
        email_outbox_poll_seconds: auth_opts.outbox.poll_seconds,
        email_outbox_batch_size: auth_opts.outbox.batch_size,
        email_outbox_max_attempts: auth_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.outbox.backoff_max_seconds,
    })))
}
