use clap::{Arg, ArgMatches, Command};

/// Reset/recovery flow options parsed from CLI matches.
#[derive(Debug)]
pub struct Options {
    pub site_base_url: String,
    pub recovery_token_ttl_seconds: i64,
    pub reset_window_seconds: u64,
    pub reset_max_per_window: u32,
    pub outbox: OutboxOptions,
}

#[derive(Debug)]
pub struct OutboxOptions {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let site_base_url = matches
            .get_one::<String>("site-base-url")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --site-base-url"))?;

        Ok(Self {
            site_base_url,
            recovery_token_ttl_seconds: matches
                .get_one::<i64>("recovery-token-ttl-seconds")
                .copied()
                .unwrap_or(3600),
            reset_window_seconds: matches
                .get_one::<u64>("reset-window-seconds")
                .copied()
                .unwrap_or(3600),
            reset_max_per_window: matches
                .get_one::<u32>("reset-max-per-window")
                .copied()
                .unwrap_or(5),
            outbox: OutboxOptions {
                poll_seconds: matches
                    .get_one::<u64>("email-outbox-poll-seconds")
                    .copied()
                    .unwrap_or(5),
                batch_size: matches
                    .get_one::<usize>("email-outbox-batch-size")
                    .copied()
                    .unwrap_or(10),
                max_attempts: matches
                    .get_one::<u32>("email-outbox-max-attempts")
                    .copied()
                    .unwrap_or(5),
                backoff_base_seconds: matches
                    .get_one::<u64>("email-outbox-backoff-base-seconds")
                    .copied()
                    .unwrap_or(5),
                backoff_max_seconds: matches
                    .get_one::<u64>("email-outbox-backoff-max-seconds")
                    .copied()
                    .unwrap_or(300),
            },
        })
    }
}

pub fn with_args(command: Command) -> Command {
    let command = with_reset_args(command);
    with_outbox_args(command)
}

fn with_reset_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("site-base-url")
                .long("site-base-url")
                .help("Portal base URL used for recovery links")
                .env("TREINA_SITE_BASE_URL")
                .default_value("https://portal.treina.app"),
        )
        .arg(
            Arg::new("recovery-token-ttl-seconds")
                .long("recovery-token-ttl-seconds")
                .help("Recovery token TTL in seconds")
                .env("TREINA_RECOVERY_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-window-seconds")
                .long("reset-window-seconds")
                .help("Rolling window for reset rate limiting in seconds")
                .env("TREINA_RESET_WINDOW_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("reset-max-per-window")
                .long("reset-max-per-window")
                .help("Max reset requests per source IP within the rolling window")
                .env("TREINA_RESET_MAX_PER_WINDOW")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("TREINA_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("TREINA_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("TREINA_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("TREINA_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("TREINA_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}
