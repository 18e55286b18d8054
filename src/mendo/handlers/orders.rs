//! Order CRUD, list filters and status transitions.
//!
//! Creating an order guards the target client; re-pointing an order at a
//! different client guards the new client as well, so an order can never be
//! attached to a client the caller does not own.

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use utoipa::ToSchema;

use super::{ItemResponse, ItemsResponse, SuccessResponse};
use crate::auth::require_current_user;
use crate::cli::globals::AuthConfig;
use crate::mendo::{
    access::{ensure_client_owned, ensure_order_owned},
    error::ApiError,
    models::{Client, Order, OrderNote, OrderStatus, OrderWithClient, Reminder, Task},
    validate::{
        as_non_empty_string, as_optional_datetime, as_optional_number, as_record, as_string,
    },
};

const ORDER_COLUMNS: &str =
    "id, user_id, client_id, title, budget, status, deadline, created_at, updated_at";

const LIST_BASE: &str = r"
    SELECT o.id, o.user_id, o.client_id, o.title, o.budget, o.status, o.deadline,
           o.created_at, o.updated_at,
           c.id AS c_id, c.user_id AS c_user_id, c.name AS c_name,
           c.contact AS c_contact, c.source AS c_source, c.created_at AS c_created_at
    FROM orders o
    JOIN clients c ON c.id = o.client_id
    WHERE o.user_id = $1
      AND ($2::text IS NULL OR o.status = $2)
      AND ($3::text IS NULL OR o.title ILIKE '%' || $3 || '%')";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineFilter {
    Overdue,
    Today,
    Upcoming,
}

impl DeadlineFilter {
    fn sql_fragment(self) -> &'static str {
        match self {
            Self::Overdue => {
                " AND o.deadline < now() AND o.status IN ('NEW', 'IN_PROGRESS', 'IN_REVIEW')"
            }
            Self::Today => {
                " AND o.deadline >= date_trunc('day', now()) \
                 AND o.deadline < date_trunc('day', now()) + interval '1 day'"
            }
            Self::Upcoming => " AND o.deadline >= now()",
        }
    }
}

struct OrdersQuery {
    status: Option<OrderStatus>,
    search: Option<String>,
    deadline: Option<DeadlineFilter>,
}

fn parse_orders_query(query: &HashMap<String, String>) -> Result<OrdersQuery, ApiError> {
    let status = match query.get("status").map(String::as_str) {
        None | Some("") => None,
        Some(value) => Some(OrderStatus::parse(value)?),
    };

    let search = query
        .get("search")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let deadline = match query.get("deadline").map(String::as_str) {
        None | Some("") => None,
        Some("overdue") => Some(DeadlineFilter::Overdue),
        Some("today") => Some(DeadlineFilter::Today),
        Some("upcoming") => Some(DeadlineFilter::Upcoming),
        Some(_) => {
            return Err(ApiError::bad_request(
                "Query parameter 'deadline' has invalid value",
            ))
        }
    };

    Ok(OrdersQuery {
        status,
        search,
        deadline,
    })
}

struct OrderInput {
    client_id: String,
    title: String,
    budget: f64,
    status: OrderStatus,
    deadline: Option<DateTime<Utc>>,
}

fn parse_order_input(body: &Value) -> Result<OrderInput, ApiError> {
    let record = as_record(body, "body")?;

    let status = match record.get("status") {
        None => OrderStatus::New,
        Some(value) => OrderStatus::parse(&as_string(Some(value), "status")?)?,
    };

    Ok(OrderInput {
        client_id: as_non_empty_string(record.get("clientId"), "clientId")?,
        title: as_non_empty_string(record.get("title"), "title")?,
        budget: as_optional_number(record.get("budget"), "budget")?.unwrap_or(0.0),
        status,
        deadline: as_optional_datetime(record.get("deadline"), "deadline")?,
    })
}

struct OrderPatch {
    client_id: Option<String>,
    title: Option<String>,
    budget: Option<f64>,
    status: Option<OrderStatus>,
    deadline: Option<Option<DateTime<Utc>>>,
}

fn parse_order_patch(body: &Value) -> Result<OrderPatch, ApiError> {
    let record = as_record(body, "body")?;

    let status = match record.get("status") {
        None => None,
        Some(value) => Some(OrderStatus::parse(&as_string(Some(value), "status")?)?),
    };

    Ok(OrderPatch {
        client_id: record
            .contains_key("clientId")
            .then(|| as_non_empty_string(record.get("clientId"), "clientId"))
            .transpose()?,
        title: record
            .contains_key("title")
            .then(|| as_non_empty_string(record.get("title"), "title"))
            .transpose()?,
        budget: record
            .contains_key("budget")
            .then(|| {
                as_optional_number(record.get("budget"), "budget")
                    .map(|value| value.unwrap_or(0.0))
            })
            .transpose()?,
        status,
        deadline: record
            .contains_key("deadline")
            .then(|| as_optional_datetime(record.get("deadline"), "deadline"))
            .transpose()?,
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub client: Client,
    pub tasks: Vec<Task>,
    pub notes: Vec<OrderNote>,
    pub reminders: Vec<Reminder>,
}

#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("search" = Option<String>, Query, description = "Substring match on title"),
        ("deadline" = Option<String>, Query, description = "One of overdue, today, upcoming"),
    ),
    responses(
        (status = 200, description = "Orders with their clients, newest first"),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<OrderWithClient>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let query = parse_orders_query(&query)?;

    let sql = format!(
        "{LIST_BASE}{} ORDER BY o.created_at DESC",
        query.deadline.map_or("", DeadlineFilter::sql_fragment)
    );

    let items = sqlx::query_as::<_, OrderWithClient>(&sql)
        .bind(user.id)
        .bind(query.status.map(OrderStatus::as_str))
        .bind(query.search)
        .fetch_all(&pool)
        .await?;

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/orders",
    responses(
        (status = 200, description = "Created order with its client"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Target client absent or owned by another principal"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<OrderWithClient>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let data = parse_order_input(&body)?;

    let client = ensure_client_owned(&pool, &data.client_id, user.id).await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        INSERT INTO orders (user_id, client_id, title, budget, status, deadline)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ORDER_COLUMNS}
        ",
    ))
    .bind(user.id)
    .bind(client.id)
    .bind(&data.title)
    .bind(data.budget)
    .bind(data.status.as_str())
    .bind(data.deadline)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse {
        item: OrderWithClient { order, client },
    }))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with client, tasks, notes and reminders"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemResponse<OrderDetail>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;
    let client = ensure_client_owned(&pool, &order.client_id.to_string(), user.id).await?;

    let tasks = sqlx::query_as::<_, Task>(
        r"
        SELECT id, order_id, title, done, position, created_at
        FROM tasks
        WHERE order_id = $1
        ORDER BY position ASC, id ASC
        ",
    )
    .bind(order.id)
    .fetch_all(&pool)
    .await?;

    let notes = sqlx::query_as::<_, OrderNote>(
        r"
        SELECT id, order_id, text, created_at
        FROM order_notes
        WHERE order_id = $1
        ORDER BY created_at DESC
        ",
    )
    .bind(order.id)
    .fetch_all(&pool)
    .await?;

    let reminders = sqlx::query_as::<_, Reminder>(
        r"
        SELECT id, order_id, remind_at, sent, channel, created_at
        FROM reminders
        WHERE order_id = $1
        ORDER BY remind_at ASC
        ",
    )
    .bind(order.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ItemResponse {
        item: OrderDetail {
            order,
            client,
            tasks,
            notes,
            reminders,
        },
    }))
}

#[utoipa::path(
    patch,
    path = "/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Updated order with its client"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order or new client absent or owned by another principal"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<OrderWithClient>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let patch = parse_order_patch(&body)?;

    let current = ensure_order_owned(&pool, &order_id, user.id).await?;

    // Re-pointing the order guards the new client under the same principal
    // before anything is written.
    let client = match &patch.client_id {
        Some(client_id) => ensure_client_owned(&pool, client_id, user.id).await?,
        None => ensure_client_owned(&pool, &current.client_id.to_string(), user.id).await?,
    };

    let title = patch.title.unwrap_or(current.title);
    let budget = patch.budget.unwrap_or(current.budget);
    let status = patch.status.unwrap_or(current.status);
    let deadline = patch.deadline.unwrap_or(current.deadline);

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET client_id = $1, title = $2, budget = $3, status = $4, deadline = $5,
            updated_at = now()
        WHERE id = $6
        RETURNING {ORDER_COLUMNS}
        ",
    ))
    .bind(client.id)
    .bind(&title)
    .bind(budget)
    .bind(status.as_str())
    .bind(deadline)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse {
        item: OrderWithClient { order, client },
    }))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order and its tasks, notes and reminders deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;

    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/status",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with the new status"),
        (status = 400, description = "Unknown status value"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<OrderWithClient>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let record = as_record(&body, "body")?;
    let status = OrderStatus::parse(&as_string(record.get("status"), "status")?)?;

    let current = ensure_order_owned(&pool, &order_id, user.id).await?;
    let client = ensure_client_owned(&pool, &current.client_id.to_string(), user.id).await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        r"
        UPDATE orders
        SET status = $1, updated_at = now()
        WHERE id = $2
        RETURNING {ORDER_COLUMNS}
        ",
    ))
    .bind(status.as_str())
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse {
        item: OrderWithClient { order, client },
    }))
}
