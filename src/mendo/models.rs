//! Row types for the owned resources.
//!
//! Every resource points at its owner either directly (`user_id`) or through
//! its parent order. The serialized shapes are the API wire format, so field
//! names are camelCase and timestamps serialize as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::ApiError;

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    InReview,
    Done,
    Archived,
}

/// States that count as in-flight for dashboards and deadline filters.
pub const ACTIVE_STATUSES: [OrderStatus; 3] = [
    OrderStatus::New,
    OrderStatus::InProgress,
    OrderStatus::InReview,
];

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::InReview => "IN_REVIEW",
            Self::Done => "DONE",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Parse a client-supplied status value.
    ///
    /// # Errors
    ///
    /// Returns a 400 naming the field when the value is not a known status.
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "IN_REVIEW" => Ok(Self::InReview),
            "DONE" => Ok(Self::Done),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(ApiError::bad_request("Field 'status' has invalid value")),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Client {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            contact: row.try_get("contact")?,
            source: row.try_get("source")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub budget: f64,
    pub status: OrderStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            client_id: row.try_get("client_id")?,
            title: row.try_get("title")?,
            budget: row.try_get("budget")?,
            status: OrderStatus::parse(&status)
                .map_err(|_| sqlx::Error::Decode(format!("unknown status: {status}").into()))?,
            deadline: row.try_get("deadline")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// An order joined with its client, the shape list views render.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithClient {
    #[serde(flatten)]
    pub order: Order,
    pub client: Client,
}

impl<'r> FromRow<'r, PgRow> for OrderWithClient {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let order = Order::from_row(row)?;
        let client = Client {
            id: row.try_get("c_id")?,
            user_id: row.try_get("c_user_id")?,
            name: row.try_get("c_name")?,
            contact: row.try_get("c_contact")?,
            source: row.try_get("c_source")?,
            created_at: row.try_get("c_created_at")?,
        };
        Ok(Self { order, client })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub order_id: Uuid,
    pub title: String,
    pub done: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Task {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            title: row.try_get("title")?,
            done: row.try_get("done")?,
            position: row.try_get("position")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderNote {
    pub id: Uuid,
    pub order_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderNote {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub order_id: Uuid,
    pub remind_at: DateTime<Utc>,
    pub sent: bool,
    pub channel: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Reminder {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            remind_at: row.try_get("remind_at")?,
            sent: row.try_get("sent")?,
            channel: row.try_get("channel")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Minimal order projection embedded in reminder listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReminderWithOrder {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub order: OrderRef,
}

impl<'r> FromRow<'r, PgRow> for ReminderWithOrder {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let reminder = Reminder::from_row(row)?;
        let order = OrderRef {
            id: row.try_get("o_id")?,
            title: row.try_get("o_title")?,
        };
        Ok(Self { reminder, order })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MessageTemplate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::New,
            OrderStatus::InProgress,
            OrderStatus::InReview,
            OrderStatus::Done,
            OrderStatus::Archived,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).expect("known"), status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!(OrderStatus::parse("PENDING").is_err());
        assert!(OrderStatus::parse("new").is_err());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&OrderStatus::InProgress).expect("encode");
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn client_serializes_camel_case() {
        let client = Client {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            name: "Acme".to_string(),
            contact: None,
            source: Some("referral".to_string()),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
        };
        let value = serde_json::to_value(&client).expect("encode");
        assert!(value.get("userId").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("user_id").is_none());
    }
}
