//! Tasks and notes nested under an order.
//!
//! Listing and creating guard the parent order; task patches and note
//! deletes resolve the full ownership chain from the child row.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

use super::{ItemResponse, ItemsResponse, SuccessResponse};
use crate::auth::require_current_user;
use crate::cli::globals::AuthConfig;
use crate::mendo::{
    access::{ensure_note_owned, ensure_order_owned, ensure_task_owned},
    error::ApiError,
    models::{OrderNote, Task},
    validate::{as_non_empty_string, as_optional_boolean, as_optional_number, as_record},
};

struct TaskInput {
    title: String,
    position: i32,
}

struct TaskPatch {
    title: Option<String>,
    done: Option<bool>,
    position: Option<i32>,
}

fn parse_task_input(body: &Value) -> Result<TaskInput, ApiError> {
    let record = as_record(body, "body")?;

    #[allow(clippy::cast_possible_truncation)]
    let position = as_optional_number(record.get("position"), "position")?.unwrap_or(0.0) as i32;

    Ok(TaskInput {
        title: as_non_empty_string(record.get("title"), "title")?,
        position,
    })
}

fn parse_task_patch(body: &Value) -> Result<TaskPatch, ApiError> {
    let record = as_record(body, "body")?;

    #[allow(clippy::cast_possible_truncation)]
    let position = record
        .contains_key("position")
        .then(|| {
            as_optional_number(record.get("position"), "position")
                .map(|value| value.unwrap_or(0.0) as i32)
        })
        .transpose()?;

    Ok(TaskPatch {
        title: record
            .contains_key("title")
            .then(|| as_non_empty_string(record.get("title"), "title"))
            .transpose()?,
        done: record
            .contains_key("done")
            .then(|| {
                as_optional_boolean(record.get("done"), "done")
                    .map(|value| value.unwrap_or(false))
            })
            .transpose()?,
        position,
    })
}

fn parse_note_input(body: &Value) -> Result<String, ApiError> {
    let record = as_record(body, "body")?;
    as_non_empty_string(record.get("text"), "text")
}

#[utoipa::path(
    get,
    path = "/orders/{id}/tasks",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Tasks of the order, by position"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<Task>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;

    let items = sqlx::query_as::<_, Task>(
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

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/tasks",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Created task"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "tasks"
)]
pub async fn create_task(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<Task>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let data = parse_task_input(&body)?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;

    let item = sqlx::query_as::<_, Task>(
        r"
        INSERT INTO tasks (order_id, title, position)
        VALUES ($1, $2, $3)
        RETURNING id, order_id, title, done, position, created_at
        ",
    )
    .bind(order.id)
    .bind(&data.title)
    .bind(data.position)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Updated task"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Task absent or owned by another principal"),
    ),
    tag = "tasks"
)]
pub async fn update_task(
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<Task>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let patch = parse_task_patch(&body)?;

    let current = ensure_task_owned(&pool, &task_id, user.id).await?;

    let title = patch.title.unwrap_or(current.title);
    let done = patch.done.unwrap_or(current.done);
    let position = patch.position.unwrap_or(current.position);

    let item = sqlx::query_as::<_, Task>(
        r"
        UPDATE tasks
        SET title = $1, done = $2, position = $3
        WHERE id = $4
        RETURNING id, order_id, title, done, position, created_at
        ",
    )
    .bind(&title)
    .bind(done)
    .bind(position)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    get,
    path = "/orders/{id}/notes",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Notes of the order, newest first"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "notes"
)]
pub async fn list_notes(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<OrderNote>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;

    let items = sqlx::query_as::<_, OrderNote>(
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

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/notes",
    params(("id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Created note"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Order absent or owned by another principal"),
    ),
    tag = "notes"
)]
pub async fn create_note(
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<OrderNote>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let text = parse_note_input(&body)?;

    let order = ensure_order_owned(&pool, &order_id, user.id).await?;

    let item = sqlx::query_as::<_, OrderNote>(
        r"
        INSERT INTO order_notes (order_id, text)
        VALUES ($1, $2)
        RETURNING id, order_id, text, created_at
        ",
    )
    .bind(order.id)
    .bind(&text)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Note absent or owned by another principal"),
    ),
    tag = "notes"
)]
pub async fn delete_note(
    Path(note_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let note = ensure_note_owned(&pool, &note_id, user.id).await?;

    sqlx::query("DELETE FROM order_notes WHERE id = $1")
        .bind(note.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_input_defaults_position() {
        let input = parse_task_input(&json!({ "title": "Wireframes" })).expect("valid");
        assert_eq!(input.position, 0);

        let input =
            parse_task_input(&json!({ "title": "Wireframes", "position": 3 })).expect("valid");
        assert_eq!(input.position, 3);
    }

    #[test]
    fn task_patch_null_done_resets_to_false() {
        let patch = parse_task_patch(&json!({ "done": null })).expect("valid");
        assert_eq!(patch.done, Some(false));
        assert_eq!(patch.title, None);
        assert_eq!(patch.position, None);
    }

    #[test]
    fn note_input_requires_text() {
        assert!(parse_note_input(&json!({})).is_err());
        assert!(parse_note_input(&json!({ "text": "  " })).is_err());
        assert_eq!(
            parse_note_input(&json!({ "text": " call tomorrow " })).expect("valid"),
            "call tomorrow"
        );
    }
}
