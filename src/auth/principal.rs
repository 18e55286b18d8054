//! Principal persistence: the `users` table.
//!
//! A principal is created the first time a Telegram identity is verified and
//! refreshed (name/username) on every subsequent sighting. Uniqueness of
//! `telegram_id` is enforced by the database, so concurrent first sightings
//! collapse into one row.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool, Row};
use utoipa::ToSchema;
use uuid::Uuid;

use super::init_data::TelegramIdentity;

/// A row of the `users` table.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: i64,
    pub name: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            telegram_id: row.try_get("telegram_id")?,
            name: row.try_get("name")?,
            username: row.try_get("username")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Public projection of a [`User`] returned by the API.
///
/// `telegram_id` is rendered as a decimal string so JavaScript clients never
/// lose precision on 64-bit identifiers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub telegram_id: String,
    pub name: String,
    pub username: Option<String>,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            telegram_id: user.telegram_id.to_string(),
            name: user.name.clone(),
            username: user.username.clone(),
            created_at: user
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Create or refresh the principal for a verified Telegram identity.
///
/// Idempotent on `telegram_id`: an existing row keeps its id and creation
/// timestamp and only the mutable profile fields are updated.
///
/// # Errors
///
/// Propagates the underlying storage failure.
pub async fn upsert_user(pool: &PgPool, identity: &TelegramIdentity) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (telegram_id, name, username)
        VALUES ($1, $2, $3)
        ON CONFLICT (telegram_id)
        DO UPDATE SET name = EXCLUDED.name, username = EXCLUDED.username
        RETURNING id, telegram_id, name, username, created_at
        ",
    )
    .bind(identity.telegram_id)
    .bind(&identity.name)
    .bind(&identity.username)
    .fetch_one(pool)
    .await
}

/// Look up a principal by internal id.
///
/// # Errors
///
/// Propagates the underlying storage failure.
pub async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r"
        SELECT id, telegram_id, name, username, created_at
        FROM users
        WHERE id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_renders_telegram_id_as_string() {
        let user = User {
            id: Uuid::nil(),
            telegram_id: 900_000_000_001,
            name: "Local Dev".to_string(),
            username: Some("local_dev".to_string()),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
        };
        let public = PublicUser::from(&user);
        assert_eq!(public.telegram_id, "900000000001");
        assert_eq!(public.id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(public.created_at, "2023-11-14T22:13:20.000Z");
    }
}
