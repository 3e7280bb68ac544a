use crate::{api, cli::globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub provider_url: String,
    pub provider_service_key: String,
    pub mail_api_url: String,
    pub mail_api_key: Option<String>,
    pub site_base_url: String,
    pub recovery_token_ttl_seconds: i64,
    pub reset_window_seconds: u64,
    pub reset_max_per_window: u32,
    pub email_outbox_poll_seconds: u64,
    pub email_outbox_batch_size: usize,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut globals = GlobalArgs::new(args.provider_url, args.site_base_url);
    globals.set_provider_service_key(SecretString::from(args.provider_service_key));

    if let Some(key) = args.mail_api_key {
        globals.set_mail_api(args.mail_api_url, SecretString::from(key));
    }

    debug!("Global args: {:?}", globals);

    let reset_config = api::handlers::reset::ResetConfig::new(globals.site_base_url.clone())
        .with_recovery_token_ttl_seconds(args.recovery_token_ttl_seconds)
        .with_window_seconds(args.reset_window_seconds)
        .with_max_per_window(args.reset_max_per_window);

    let email_config = api::email::EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.email_outbox_poll_seconds)
        .with_batch_size(args.email_outbox_batch_size)
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_base_seconds(args.email_outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.email_outbox_backoff_max_seconds);

    api::new(args.port, args.dsn, &globals, reset_config, email_config).await
}
