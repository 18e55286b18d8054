//! Message template CRUD.

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
    access::ensure_template_owned,
    error::ApiError,
    models::MessageTemplate,
    validate::{as_non_empty_string, as_record},
};

struct TemplateInput {
    title: String,
    body: String,
}

struct TemplatePatch {
    title: Option<String>,
    body: Option<String>,
}

fn parse_template_input(payload: &Value) -> Result<TemplateInput, ApiError> {
    let record = as_record(payload, "body")?;
    Ok(TemplateInput {
        title: as_non_empty_string(record.get("title"), "title")?,
        body: as_non_empty_string(record.get("body"), "body")?,
    })
}

fn parse_template_patch(payload: &Value) -> Result<TemplatePatch, ApiError> {
    let record = as_record(payload, "body")?;
    Ok(TemplatePatch {
        title: record
            .contains_key("title")
            .then(|| as_non_empty_string(record.get("title"), "title"))
            .transpose()?,
        body: record
            .contains_key("body")
            .then(|| as_non_empty_string(record.get("body"), "body"))
            .transpose()?,
    })
}

#[utoipa::path(
    get,
    path = "/templates",
    responses(
        (status = 200, description = "Templates of the authenticated principal, newest first"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "templates"
)]
pub async fn list_templates(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<MessageTemplate>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let items = sqlx::query_as::<_, MessageTemplate>(
        r"
        SELECT id, user_id, title, body, created_at
        FROM message_templates
        WHERE user_id = $1
        ORDER BY created_at DESC
        ",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/templates",
    responses(
        (status = 200, description = "Created template"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "templates"
)]
pub async fn create_template(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<MessageTemplate>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let data = parse_template_input(&body)?;

    let item = sqlx::query_as::<_, MessageTemplate>(
        r"
        INSERT INTO message_templates (user_id, title, body)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, title, body, created_at
        ",
    )
    .bind(user.id)
    .bind(&data.title)
    .bind(&data.body)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    patch,
    path = "/templates/{id}",
    params(("id" = String, Path, description = "Template id")),
    responses(
        (status = 200, description = "Updated template"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Template absent or owned by another principal"),
    ),
    tag = "templates"
)]
pub async fn update_template(
    Path(template_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<MessageTemplate>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let patch = parse_template_patch(&body)?;

    let current = ensure_template_owned(&pool, &template_id, user.id).await?;

    let title = patch.title.unwrap_or(current.title);
    let body = patch.body.unwrap_or(current.body);

    let item = sqlx::query_as::<_, MessageTemplate>(
        r"
        UPDATE message_templates
        SET title = $1, body = $2
        WHERE id = $3
        RETURNING id, user_id, title, body, created_at
        ",
    )
    .bind(&title)
    .bind(&body)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    delete,
    path = "/templates/{id}",
    params(("id" = String, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Template absent or owned by another principal"),
    ),
    tag = "templates"
)]
pub async fn delete_template(
    Path(template_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let template = ensure_template_owned(&pool, &template_id, user.id).await?;

    sqlx::query("DELETE FROM message_templates WHERE id = $1")
        .bind(template.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_requires_both_fields() {
        assert!(parse_template_input(&json!({ "title": "Follow-up" })).is_err());
        assert!(parse_template_input(&json!({ "body": "Hi!" })).is_err());

        let input = parse_template_input(&json!({ "title": "Follow-up", "body": "Hi!" }))
            .expect("valid");
        assert_eq!(input.title, "Follow-up");
        assert_eq!(input.body, "Hi!");
    }

    #[test]
    fn patch_allows_partial_updates() {
        let patch = parse_template_patch(&json!({ "body": "Updated" })).expect("valid");
        assert_eq!(patch.title, None);
        assert_eq!(patch.body.as_deref(), Some("Updated"));

        assert!(parse_template_patch(&json!({ "title": "" })).is_err());
    }
}
