use crate::cli::{actions::Action, globals::AuthConfig};
use anyhow::{bail, Result};
use secrecy::SecretString;

// Outside production a fixed signing secret keeps local setups friction-free;
// in production the secret must be provided or startup fails.
const DEV_TOKEN_SECRET: &str = "dev-auth-token-secret";

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let dsn = matches
        .get_one("dsn")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?;

    let production = matches.get_flag("production");

    let token_secret = match matches
        .get_one::<String>("token-secret")
        .filter(|secret| !secret.is_empty())
    {
        Some(secret) => SecretString::from(secret.to_string()),
        None if production => {
            bail!("--token-secret is required when running with --production")
        }
        None => SecretString::from(DEV_TOKEN_SECRET.to_string()),
    };

    let mut config = AuthConfig::new(production, token_secret)
        .with_allow_user_id_header(matches.get_flag("allow-user-id-header"));

    if let Some(ttl) = matches.get_one::<i64>("token-ttl").copied() {
        config = config.with_token_ttl_seconds(ttl);
    }

    if let Some(max_age) = matches.get_one::<i64>("auth-max-age").copied() {
        config = config.with_auth_max_age_seconds(max_age);
    }

    if let Some(bot_token) = matches
        .get_one::<String>("bot-token")
        .filter(|token| !token.is_empty())
    {
        config = config.with_bot_token(SecretString::from(bot_token.to_string()));
    }

    Ok(Action::Server { port, dsn, config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn matches_from(args: &[&str]) -> clap::ArgMatches {
        commands::new().get_matches_from(args)
    }

    #[test]
    fn server_action_with_defaults() {
        temp_env::with_vars(
            [
                ("MENDO_PRODUCTION", None::<&str>),
                ("MENDO_TOKEN_SECRET", None),
                ("MENDO_BOT_TOKEN", None),
            ],
            || {
                let matches = matches_from(&["mendo", "--dsn", "postgres://localhost/mendo"]);
                let action = handler(&matches).expect("action");

                let Action::Server { port, dsn, config } = action;
                assert_eq!(port, 8080);
                assert_eq!(dsn, "postgres://localhost/mendo");
                assert!(!config.production());
                assert!(config.bot_token().is_none());
                assert_eq!(config.token_secret().expose_secret(), DEV_TOKEN_SECRET);
            },
        );
    }

    #[test]
    fn production_requires_token_secret() {
        temp_env::with_vars([("MENDO_TOKEN_SECRET", None::<&str>)], || {
            let matches = matches_from(&[
                "mendo",
                "--dsn",
                "postgres://localhost/mendo",
                "--production",
            ]);
            let result = handler(&matches);
            assert!(result.is_err());
        });
    }

    #[test]
    fn production_with_token_secret_succeeds() {
        temp_env::with_vars([("MENDO_BOT_TOKEN", None::<&str>)], || {
            let matches = matches_from(&[
                "mendo",
                "--dsn",
                "postgres://localhost/mendo",
                "--production",
                "--token-secret",
                "strong-secret",
            ]);
            let action = handler(&matches).expect("action");

            let Action::Server { config, .. } = action;
            assert!(config.production());
            assert_eq!(config.token_secret().expose_secret(), "strong-secret");
        });
    }

    #[test]
    fn bot_token_and_ttls_are_threaded_through() {
        temp_env::with_vars(
            [
                ("MENDO_PRODUCTION", None::<&str>),
                ("MENDO_TOKEN_SECRET", None),
            ],
            || {
                let matches = matches_from(&[
                    "mendo",
                    "--dsn",
                    "postgres://localhost/mendo",
                    "--bot-token",
                    "123456:abc",
                    "--token-ttl",
                    "3600",
                    "--auth-max-age",
                    "120",
                    "--allow-user-id-header",
                ]);
                let action = handler(&matches).expect("action");

                let Action::Server { config, .. } = action;
                assert_eq!(
                    config.bot_token().map(ExposeSecret::expose_secret),
                    Some("123456:abc")
                );
                assert_eq!(config.token_ttl_seconds(), 3600);
                assert_eq!(config.auth_max_age_seconds(), 120);
                assert!(config.allow_user_id_header());
            },
        );
    }
}
