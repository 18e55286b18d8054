//! Login and identity endpoints.
//!
//! `POST /auth/telegram` is the only route that accepts a platform
//! assertion in the body; everything else authenticates through the
//! resolver. Outside production the endpoint also accepts a `devUser`
//! payload so the app can be exercised without Telegram credentials.

use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{
    init_data::{self, TelegramIdentity},
    principal, require_current_user, session_token, PublicUser,
};
use crate::cli::globals::AuthConfig;
use crate::mendo::{
    error::ApiError,
    validate::{as_non_empty_string, as_number, as_optional_string, as_record},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub mode: &'static str,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[utoipa::path(
    post,
    path = "/auth/telegram",
    responses(
        (status = 200, description = "Authenticated; returns the principal and a session token", body = AuthResponse),
        (status = 400, description = "Neither a usable 'initData' nor a permitted 'devUser' was provided"),
        (status = 401, description = "The platform assertion failed verification"),
    ),
    tag = "auth"
)]
pub async fn telegram_auth(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let record = as_record(&body, "body")?;

    let init_data = record
        .get("initData")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(init_data) = init_data {
        let Some(bot_token) = config.bot_token() else {
            return Err(ApiError::bad_request(
                "Bot token is not configured for Telegram auth",
            ));
        };

        let validated = init_data::validate_init_data(
            init_data,
            bot_token.expose_secret(),
            config.auth_max_age_seconds(),
            Utc::now().timestamp(),
        )?;

        let user = principal::upsert_user(&pool, &validated.user).await?;
        let token = issue_token(&user.id.to_string(), &config)?;

        return Ok(Json(AuthResponse {
            mode: "telegram",
            user: PublicUser::from(&user),
            token,
        }));
    }

    if !config.production() {
        if let Some(dev_user) = record.get("devUser") {
            let identity = parse_dev_user(dev_user)?;
            let user = principal::upsert_user(&pool, &identity).await?;
            let token = issue_token(&user.id.to_string(), &config)?;

            return Ok(Json(AuthResponse {
                mode: "dev",
                user: PublicUser::from(&user),
                token,
            }));
        }
    }

    Err(ApiError::bad_request("Provide 'initData' for Telegram auth"))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated principal", body = MeResponse),
        (status = 401, description = "No credential path succeeded"),
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<MeResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    Ok(Json(MeResponse {
        user: PublicUser::from(&user),
    }))
}

fn issue_token(user_id: &str, config: &AuthConfig) -> Result<String, ApiError> {
    Ok(session_token::issue(
        user_id,
        config.token_secret().expose_secret(),
        config.token_ttl_seconds(),
        Utc::now().timestamp(),
    )?)
}

fn parse_dev_user(value: &Value) -> Result<TelegramIdentity, ApiError> {
    let record = as_record(value, "devUser")?;

    #[allow(clippy::cast_possible_truncation)]
    let telegram_id = as_number(record.get("telegramId"), "devUser.telegramId")? as i64;

    Ok(TelegramIdentity {
        telegram_id,
        name: as_non_empty_string(record.get("name"), "devUser.name")?,
        username: as_optional_string(record.get("username"), "devUser.username")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dev_user_parses_with_numeric_or_string_id() {
        let identity = parse_dev_user(&json!({
            "telegramId": 900000000001i64,
            "name": " Local Dev ",
            "username": "local_dev",
        }))
        .expect("valid");
        assert_eq!(identity.telegram_id, 900_000_000_001);
        assert_eq!(identity.name, "Local Dev");
        assert_eq!(identity.username.as_deref(), Some("local_dev"));

        let identity = parse_dev_user(&json!({
            "telegramId": "42",
            "name": "Dev",
        }))
        .expect("valid");
        assert_eq!(identity.telegram_id, 42);
        assert_eq!(identity.username, None);
    }

    #[test]
    fn dev_user_requires_name_and_id() {
        assert!(parse_dev_user(&json!({ "name": "Dev" })).is_err());
        assert!(parse_dev_user(&json!({ "telegramId": 1 })).is_err());
        assert!(parse_dev_user(&json!({ "telegramId": 1, "name": "  " })).is_err());
        assert!(parse_dev_user(&json!("not-an-object")).is_err());
    }
}
