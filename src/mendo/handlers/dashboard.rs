//! Dashboard aggregation.

use axum::{extract::Extension, http::HeaderMap, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::require_current_user;
use crate::cli::globals::AuthConfig;
use crate::mendo::error::ApiError;

const UPCOMING_LIMIT: i64 = 5;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub active_orders: i64,
    pub overdue_orders: i64,
    pub monthly_income: f64,
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDeadline {
    pub id: Uuid,
    pub title: String,
    pub deadline: String,
    pub client_name: String,
}

#[utoipa::path(
    get,
    path = "/dashboard/summary",
    responses(
        (status = 200, description = "Active/overdue counts, current-month income and the next deadlines", body = DashboardSummary),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "dashboard"
)]
pub async fn summary(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let active_orders: i64 = sqlx::query_scalar(
        r"
        SELECT count(*)
        FROM orders
        WHERE user_id = $1
          AND status IN ('NEW', 'IN_PROGRESS', 'IN_REVIEW')
        ",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await?;

    let overdue_orders: i64 = sqlx::query_scalar(
        r"
        SELECT count(*)
        FROM orders
        WHERE user_id = $1
          AND status IN ('NEW', 'IN_PROGRESS', 'IN_REVIEW')
          AND deadline < now()
        ",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await?;

    // Income counts orders finished (last touched) inside the current
    // calendar month.
    let monthly_income: f64 = sqlx::query_scalar(
        r"
        SELECT COALESCE(SUM(budget), 0)::double precision
        FROM orders
        WHERE user_id = $1
          AND status = 'DONE'
          AND updated_at >= date_trunc('month', now())
          AND updated_at < date_trunc('month', now()) + interval '1 month'
        ",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await?;

    let rows = sqlx::query(
        r"
        SELECT o.id, o.title, o.deadline, c.name AS client_name
        FROM orders o
        JOIN clients c ON c.id = o.client_id
        WHERE o.user_id = $1
          AND o.status IN ('NEW', 'IN_PROGRESS', 'IN_REVIEW')
          AND o.deadline >= now()
        ORDER BY o.deadline ASC
        LIMIT $2
        ",
    )
    .bind(user.id)
    .bind(UPCOMING_LIMIT)
    .fetch_all(&pool)
    .await?;

    let mut upcoming_deadlines = Vec::with_capacity(rows.len());
    for row in rows {
        let deadline: DateTime<Utc> = row.try_get("deadline")?;
        upcoming_deadlines.push(UpcomingDeadline {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            deadline: deadline.to_rfc3339_opts(SecondsFormat::Millis, true),
            client_name: row.try_get("client_name")?,
        });
    }

    Ok(Json(DashboardSummary {
        active_orders,
        overdue_orders,
        monthly_income,
        upcoming_deadlines,
    }))
}
