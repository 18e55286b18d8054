//! Telegram Mini App `initData` verification.
//!
//! The Mini App host hands the web client a query-string-encoded set of
//! fields plus a `hash` signed by Telegram. Verification rebuilds the
//! data-check string (every pair except `hash`, sorted by key, joined with
//! newlines), derives the secret key as HMAC-SHA256 keyed with the literal
//! `WebAppData` over the bot token, and compares the recomputed digest to the
//! supplied one in constant time before trusting any field.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Identity claims extracted from a verified `initData` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramIdentity {
    pub telegram_id: i64,
    pub name: String,
    pub username: Option<String>,
}

/// Outcome of a successful `initData` verification.
#[derive(Debug, Clone)]
pub struct ValidatedInitData {
    pub auth_date: i64,
    pub user: TelegramIdentity,
}

#[derive(Debug, Deserialize)]
struct RawTelegramUser {
    id: i64,
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

fn hmac_sha256(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// Verify a raw `initData` string against the bot token.
///
/// The signature is checked before any field is interpreted; `auth_date`
/// freshness uses the absolute clock difference so future-dated assertions
/// are rejected alongside stale ones.
///
/// # Errors
///
/// Returns an [`AuthError`] when the hash is missing or does not match, the
/// `auth_date` is absent, non-numeric or outside `max_age_seconds`, or the
/// `user` field is absent or malformed.
pub fn validate_init_data(
    raw: &str,
    bot_token: &str,
    max_age_seconds: i64,
    now_unix: i64,
) -> Result<ValidatedInitData, AuthError> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let supplied_hash = pairs
        .iter()
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.clone())
        .ok_or(AuthError::MissingHash)?;

    let mut check_pairs: Vec<&(String, String)> =
        pairs.iter().filter(|(key, _)| key != "hash").collect();
    check_pairs.sort_by(|left, right| left.0.cmp(&right.0));

    let data_check_string = check_pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret_key = hmac_sha256(b"WebAppData");
    secret_key.update(bot_token.as_bytes());
    let secret_key = secret_key.finalize().into_bytes();

    let supplied_digest =
        hex::decode(supplied_hash.as_bytes()).map_err(|_| AuthError::InvalidSignature)?;

    let mut mac = hmac_sha256(&secret_key);
    mac.update(data_check_string.as_bytes());
    mac.verify_slice(&supplied_digest)
        .map_err(|_| AuthError::InvalidSignature)?;

    let auth_date = pairs
        .iter()
        .find(|(key, _)| key == "auth_date")
        .map(|(_, value)| value.as_str())
        .ok_or(AuthError::MissingAuthDate)?;
    let auth_date: i64 = auth_date
        .parse()
        .map_err(|_| AuthError::InvalidAuthDate)?;

    if (now_unix - auth_date).abs() > max_age_seconds {
        return Err(AuthError::AssertionExpired);
    }

    let raw_user = pairs
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.as_str())
        .ok_or(AuthError::MissingUser)?;

    let user = parse_telegram_user(raw_user)?;

    Ok(ValidatedInitData { auth_date, user })
}

fn parse_telegram_user(raw_user: &str) -> Result<TelegramIdentity, AuthError> {
    let user: RawTelegramUser =
        serde_json::from_str(raw_user).map_err(|_| AuthError::InvalidUser)?;

    if user.first_name.trim().is_empty() {
        return Err(AuthError::InvalidUser);
    }

    let name = format!(
        "{} {}",
        user.first_name,
        user.last_name.as_deref().unwrap_or("")
    )
    .trim()
    .to_string();

    let username = user
        .username
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(TelegramIdentity {
        telegram_id: user.id,
        name,
        username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "123456:test-bot-token";
    const NOW: i64 = 1_700_000_000;
    const MAX_AGE: i64 = 86_400;

    /// Build a signed `initData` string the way the Telegram host does.
    fn sign_init_data(pairs: &[(&str, &str)], bot_token: &str) -> String {
        let mut sorted: Vec<&(&str, &str)> = pairs.iter().collect();
        sorted.sort_by(|left, right| left.0.cmp(right.0));
        let data_check_string = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut secret_key = hmac_sha256(b"WebAppData");
        secret_key.update(bot_token.as_bytes());
        let secret_key = secret_key.finalize().into_bytes();

        let mut mac = hmac_sha256(&secret_key);
        mac.update(data_check_string.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("hash", &digest);
        serializer.finish()
    }

    fn fresh_init_data() -> String {
        sign_init_data(
            &[
                ("auth_date", &NOW.to_string()),
                (
                    "user",
                    r#"{"id":42,"first_name":"Alice","last_name":"Doe","username":"alice"}"#,
                ),
                ("query_id", "AAF0x"),
            ],
            BOT_TOKEN,
        )
    }

    #[test]
    fn accepts_valid_assertion() {
        let validated =
            validate_init_data(&fresh_init_data(), BOT_TOKEN, MAX_AGE, NOW).expect("valid");
        assert_eq!(validated.auth_date, NOW);
        assert_eq!(validated.user.telegram_id, 42);
        assert_eq!(validated.user.name, "Alice Doe");
        assert_eq!(validated.user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn rejects_wrong_bot_token() {
        let result = validate_init_data(&fresh_init_data(), "999:other-token", MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn rejects_tampered_field() {
        let raw = fresh_init_data().replace("query_id=AAF0x", "query_id=AAF0y");
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn rejects_missing_hash() {
        let result = validate_init_data("auth_date=1&user=%7B%7D", BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::MissingHash)));
    }

    #[test]
    fn rejects_garbage_hash() {
        let raw = sign_init_data(&[("auth_date", "1")], BOT_TOKEN);
        let raw = raw.replace("hash=", "hash=zz");
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn rejects_stale_auth_date() {
        let stale = (NOW - MAX_AGE - 1).to_string();
        let raw = sign_init_data(
            &[
                ("auth_date", &stale),
                ("user", r#"{"id":42,"first_name":"Alice"}"#),
            ],
            BOT_TOKEN,
        );
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::AssertionExpired)));
    }

    #[test]
    fn rejects_future_auth_date() {
        let future = (NOW + MAX_AGE + 1).to_string();
        let raw = sign_init_data(
            &[
                ("auth_date", &future),
                ("user", r#"{"id":42,"first_name":"Alice"}"#),
            ],
            BOT_TOKEN,
        );
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::AssertionExpired)));
    }

    #[test]
    fn rejects_missing_auth_date() {
        let raw = sign_init_data(&[("user", r#"{"id":42,"first_name":"Alice"}"#)], BOT_TOKEN);
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::MissingAuthDate)));
    }

    #[test]
    fn rejects_non_numeric_auth_date() {
        let raw = sign_init_data(
            &[
                ("auth_date", "soon"),
                ("user", r#"{"id":42,"first_name":"Alice"}"#),
            ],
            BOT_TOKEN,
        );
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidAuthDate)));
    }

    #[test]
    fn rejects_missing_user() {
        let raw = sign_init_data(&[("auth_date", &NOW.to_string())], BOT_TOKEN);
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::MissingUser)));
    }

    #[test]
    fn rejects_unparseable_user() {
        let raw = sign_init_data(
            &[("auth_date", &NOW.to_string()), ("user", "{not json")],
            BOT_TOKEN,
        );
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidUser)));
    }

    #[test]
    fn rejects_blank_first_name() {
        let raw = sign_init_data(
            &[
                ("auth_date", &NOW.to_string()),
                ("user", r#"{"id":42,"first_name":"  "}"#),
            ],
            BOT_TOKEN,
        );
        let result = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW);
        assert!(matches!(result, Err(AuthError::InvalidUser)));
    }

    #[test]
    fn trims_name_and_drops_empty_username() {
        let raw = sign_init_data(
            &[
                ("auth_date", &NOW.to_string()),
                ("user", r#"{"id":7,"first_name":"Bob","username":"  "}"#),
            ],
            BOT_TOKEN,
        );
        let validated = validate_init_data(&raw, BOT_TOKEN, MAX_AGE, NOW).expect("valid");
        assert_eq!(validated.user.name, "Bob");
        assert_eq!(validated.user.username, None);
    }
}
