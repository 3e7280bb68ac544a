use clap::{Arg, ArgMatches, Command};

pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_SERVICE_KEY: &str = "provider-service-key";
pub const ARG_MAIL_API_URL: &str = "mail-api-url";
pub const ARG_MAIL_API_KEY: &str = "mail-api-key";

/// Identity provider and transactional mail options.
#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub service_key: String,
    pub mail_api_url: String,
    pub mail_api_key: Option<String>,
}

impl Options {
    /// Parse provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            url: read_required(ARG_PROVIDER_URL)?,
            service_key: read_required(ARG_PROVIDER_SERVICE_KEY)?,
            mail_api_url: matches
                .get_one::<String>(ARG_MAIL_API_URL)
                .cloned()
                .unwrap_or_default(),
            mail_api_key: matches.get_one::<String>(ARG_MAIL_API_KEY).cloned(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL")
                .env("TREINA_PROVIDER_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_SERVICE_KEY)
                .long(ARG_PROVIDER_SERVICE_KEY)
                .help("Identity provider service-role key (server-side only)")
                .env("TREINA_PROVIDER_SERVICE_KEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MAIL_API_URL)
                .long(ARG_MAIL_API_URL)
                .help("Transactional mail API base URL")
                .env("TREINA_MAIL_API_URL")
                .default_value("https://api.resend.com"),
        )
        .arg(
            Arg::new(ARG_MAIL_API_KEY)
                .long(ARG_MAIL_API_KEY)
                .help("Transactional mail API key (omit to log emails instead of sending)")
                .env("TREINA_MAIL_API_KEY"),
        )
}
