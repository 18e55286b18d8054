//! Reminder CRUD.
//!
//! Reminders hang off an order, so creation guards the target order and
//! patch/delete resolve the chain from the reminder row. Delivery is out of
//! scope; only the `sent` flag is stored.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::{ItemResponse, ItemsResponse, SuccessResponse};
use crate::auth::require_current_user;
use crate::cli::globals::AuthConfig;
use crate::mendo::{
    access::{ensure_order_owned, ensure_reminder_owned},
    error::ApiError,
    models::{OrderRef, Reminder, ReminderWithOrder},
    validate::{
        as_datetime, as_non_empty_string, as_optional_boolean, as_optional_string, as_record,
    },
};

const DEFAULT_CHANNEL: &str = "TELEGRAM";

struct ReminderInput {
    order_id: String,
    remind_at: DateTime<Utc>,
    sent: bool,
    channel: String,
}

struct ReminderPatch {
    remind_at: Option<DateTime<Utc>>,
    sent: Option<bool>,
    channel: Option<String>,
}

fn parse_reminder_input(body: &Value) -> Result<ReminderInput, ApiError> {
    let record = as_record(body, "body")?;

    Ok(ReminderInput {
        order_id: as_non_empty_string(record.get("orderId"), "orderId")?,
        remind_at: as_datetime(record.get("remindAt"), "remindAt")?,
        sent: as_optional_boolean(record.get("sent"), "sent")?.unwrap_or(false),
        channel: as_optional_string(record.get("channel"), "channel")?
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
    })
}

fn parse_reminder_patch(body: &Value) -> Result<ReminderPatch, ApiError> {
    let record = as_record(body, "body")?;

    // Unlike the other optional datetimes, a reminder without a fire time is
    // meaningless, so an explicit null is rejected instead of clearing.
    let remind_at = match record.get("remindAt") {
        None => None,
        Some(Value::Null) => {
            return Err(ApiError::bad_request("Field 'remindAt' cannot be null"))
        }
        Some(Value::String(text)) if text.is_empty() => {
            return Err(ApiError::bad_request("Field 'remindAt' cannot be null"))
        }
        Some(value) => Some(as_datetime(Some(value), "remindAt")?),
    };

    Ok(ReminderPatch {
        remind_at,
        sent: record
            .contains_key("sent")
            .then(|| {
                as_optional_boolean(record.get("sent"), "sent")
                    .map(|value| value.unwrap_or(false))
            })
            .transpose()?,
        channel: record
            .contains_key("channel")
            .then(|| {
                as_optional_string(record.get("channel"), "channel")
                    .map(|value| value.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()))
            })
            .transpose()?,
    })
}

async fn order_ref(pool: &PgPool, order_id: Uuid) -> Result<OrderRef, ApiError> {
    let row = sqlx::query_as::<_, OrderRefRow>(
        r"
        SELECT id, title
        FROM orders
        WHERE id = $1
        ",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Reminder not found"))?;

    Ok(OrderRef {
        id: row.id,
        title: row.title,
    })
}

struct OrderRefRow {
    id: Uuid,
    title: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRefRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
        })
    }
}

#[utoipa::path(
    get,
    path = "/reminders",
    responses(
        (status = 200, description = "Reminders across the principal's orders, soonest first"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "reminders"
)]
pub async fn list_reminders(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<ReminderWithOrder>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let items = sqlx::query_as::<_, ReminderWithOrder>(
        r"
        SELECT r.id, r.order_id, r.remind_at, r.sent, r.channel, r.created_at,
               o.id AS o_id, o.title AS o_title
        FROM reminders r
        JOIN orders o ON o.id = r.order_id
        WHERE o.user_id = $1
        ORDER BY r.remind_at ASC
        ",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/reminders",
    responses(
        (status = 200, description = "Created reminder with its order"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "reminders"
)]
pub async fn create_reminder(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<ReminderWithOrder>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let data = parse_reminder_input(&body)?;

    let order = ensure_order_owned(&pool, &data.order_id, user.id).await?;

    let reminder = sqlx::query_as::<_, Reminder>(
        r"
        INSERT INTO reminders (order_id, remind_at, sent, channel)
        VALUES ($1, $2, $3, $4)
        RETURNING id, order_id, remind_at, sent, channel, created_at
        ",
    )
    .bind(order.id)
    .bind(data.remind_at)
    .bind(data.sent)
    .bind(&data.channel)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse {
        item: ReminderWithOrder {
            reminder,
            order: OrderRef {
                id: order.id,
                title: order.title,
            },
        },
    }))
}

#[utoipa::path(
    patch,
    path = "/reminders/{id}",
    params(("id" = String, Path, description = "Reminder id")),
    responses(
        (status = 200, description = "Updated reminder with its order"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Reminder absent or owned by another principal"),
    ),
    tag = "reminders"
)]
pub async fn update_reminder(
    Path(reminder_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<ReminderWithOrder>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let patch = parse_reminder_patch(&body)?;

    let current = ensure_reminder_owned(&pool, &reminder_id, user.id).await?;

    let remind_at = patch.remind_at.unwrap_or(current.remind_at);
    let sent = patch.sent.unwrap_or(current.sent);
    let channel = patch.channel.unwrap_or(current.channel);

    let reminder = sqlx::query_as::<_, Reminder>(
        r"
        UPDATE reminders
        SET remind_at = $1, sent = $2, channel = $3
        WHERE id = $4
        RETURNING id, order_id, remind_at, sent, channel, created_at
        ",
    )
    .bind(remind_at)
    .bind(sent)
    .bind(&channel)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    let order = order_ref(&pool, reminder.order_id).await?;

    Ok(Json(ItemResponse {
        item: ReminderWithOrder { reminder, order },
    }))
}

#[utoipa::path(
    delete,
    path = "/reminders/{id}",
    params(("id" = String, Path, description = "Reminder id")),
    responses(
        (status = 200, description = "Reminder deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Reminder absent or owned by another principal"),
    ),
    tag = "reminders"
)]
pub async fn delete_reminder(
    Path(reminder_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let reminder = ensure_reminder_owned(&pool, &reminder_id, user.id).await?;

    sqlx::query("DELETE FROM reminders WHERE id = $1")
        .bind(reminder.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_defaults_sent_and_channel() {
        let input = parse_reminder_input(&json!({
            "orderId": "o1",
            "remindAt": "2026-03-01T10:00:00Z",
        }))
        .expect("valid");
        assert!(!input.sent);
        assert_eq!(input.channel, "TELEGRAM");
    }

    #[test]
    fn input_requires_order_and_time() {
        assert!(parse_reminder_input(&json!({ "remindAt": "2026-03-01T10:00:00Z" })).is_err());
        assert!(parse_reminder_input(&json!({ "orderId": "o1" })).is_err());
        assert!(parse_reminder_input(&json!({
            "orderId": "o1",
            "remindAt": "not-a-date",
        }))
        .is_err());
    }

    #[test]
    fn patch_rejects_null_remind_at() {
        assert!(parse_reminder_patch(&json!({ "remindAt": null })).is_err());
        assert!(parse_reminder_patch(&json!({ "remindAt": "" })).is_err());
    }

    #[test]
    fn patch_null_channel_resets_to_default() {
        let patch = parse_reminder_patch(&json!({ "channel": null })).expect("valid");
        assert_eq!(patch.channel.as_deref(), Some("TELEGRAM"));
        assert_eq!(patch.remind_at, None);
    }
}
