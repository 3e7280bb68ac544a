use secrecy::SecretString;

/// Shared configuration handed to the server and its collaborators.
///
/// Secret material stays behind `SecretString` so accidental logging of the
/// struct never exposes keys.
#[derive(Clone)]
pub struct GlobalArgs {
    pub provider_url: String,
    pub provider_service_key: SecretString,
    pub mail_api_url: String,
    pub mail_api_key: SecretString,
    pub site_base_url: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: String, site_base_url: String) -> Self {
        Self {
            provider_url,
            provider_service_key: SecretString::default(),
            mail_api_url: String::new(),
            mail_api_key: SecretString::default(),
            site_base_url,
        }
    }

    pub fn set_provider_service_key(&mut self, key: SecretString) {
        self.provider_service_key = key;
    }

    pub fn set_mail_api(&mut self, url: String, key: SecretString) {
        self.mail_api_url = url;
        self.mail_api_key = key;
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("provider_url", &self.provider_url)
            .field("provider_service_key", &"***")
            .field("mail_api_url", &self.mail_api_url)
            .field("mail_api_key", &"***")
            .field("site_base_url", &self.site_base_url)
            .finish()
    }
}
