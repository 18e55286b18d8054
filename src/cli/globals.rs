use secrecy::SecretString;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_AUTH_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

/// Immutable runtime configuration for the auth subsystem.
///
/// Built once from CLI/env arguments at startup and threaded into the
/// verifier, token codec and resolver as plain arguments, so the crypto
/// paths stay testable with injected secrets and never read the
/// environment themselves.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    production: bool,
    bot_token: Option<SecretString>,
    token_secret: SecretString,
    token_ttl_seconds: i64,
    auth_max_age_seconds: i64,
    allow_user_id_header: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(production: bool, token_secret: SecretString) -> Self {
        Self {
            production,
            bot_token: None,
            token_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            auth_max_age_seconds: DEFAULT_AUTH_MAX_AGE_SECONDS,
            allow_user_id_header: false,
        }
    }

    #[must_use]
    pub fn with_bot_token(mut self, bot_token: SecretString) -> Self {
        self.bot_token = Some(bot_token);
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_auth_max_age_seconds(mut self, seconds: i64) -> Self {
        self.auth_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_allow_user_id_header(mut self, allow: bool) -> Self {
        self.allow_user_id_header = allow;
        self
    }

    #[must_use]
    pub fn production(&self) -> bool {
        self.production
    }

    #[must_use]
    pub fn bot_token(&self) -> Option<&SecretString> {
        self.bot_token.as_ref()
    }

    #[must_use]
    pub fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn auth_max_age_seconds(&self) -> i64 {
        self.auth_max_age_seconds
    }

    #[must_use]
    pub fn allow_user_id_header(&self) -> bool {
        self.allow_user_id_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_are_development_safe() {
        let config = AuthConfig::new(false, SecretString::from("secret".to_string()));
        assert!(!config.production());
        assert!(config.bot_token().is_none());
        assert!(!config.allow_user_id_header());
        assert_eq!(config.token_ttl_seconds(), 604_800);
        assert_eq!(config.auth_max_age_seconds(), 86_400);
        assert_eq!(config.token_secret().expose_secret(), "secret");
    }

    #[test]
    fn builders_override_fields() {
        let config = AuthConfig::new(true, SecretString::from("secret".to_string()))
            .with_bot_token(SecretString::from("123:abc".to_string()))
            .with_token_ttl_seconds(60)
            .with_auth_max_age_seconds(30)
            .with_allow_user_id_header(true);
        assert!(config.production());
        assert!(config.allow_user_id_header());
        assert_eq!(config.token_ttl_seconds(), 60);
        assert_eq!(config.auth_max_age_seconds(), 30);
        assert_eq!(
            config.bot_token().map(ExposeSecret::expose_secret),
            Some("123:abc")
        );
    }
}
