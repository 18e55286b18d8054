//! Client CRUD.

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
    access::ensure_client_owned,
    error::ApiError,
    models::Client,
    validate::{as_non_empty_string, as_optional_string, as_record},
};

struct ClientInput {
    name: String,
    contact: Option<String>,
    source: Option<String>,
}

/// Patch fields are tri-state: absent (leave unchanged), `null` (clear) or a
/// value. The outer `Option` is presence, the inner one the new value.
struct ClientPatch {
    name: Option<String>,
    contact: Option<Option<String>>,
    source: Option<Option<String>>,
}

fn parse_client_input(body: &Value) -> Result<ClientInput, ApiError> {
    let record = as_record(body, "body")?;
    Ok(ClientInput {
        name: as_non_empty_string(record.get("name"), "name")?,
        contact: as_optional_string(record.get("contact"), "contact")?,
        source: as_optional_string(record.get("source"), "source")?,
    })
}

fn parse_client_patch(body: &Value) -> Result<ClientPatch, ApiError> {
    let record = as_record(body, "body")?;
    Ok(ClientPatch {
        name: record
            .contains_key("name")
            .then(|| as_non_empty_string(record.get("name"), "name"))
            .transpose()?,
        contact: record
            .contains_key("contact")
            .then(|| as_optional_string(record.get("contact"), "contact"))
            .transpose()?,
        source: record
            .contains_key("source")
            .then(|| as_optional_string(record.get("source"), "source"))
            .transpose()?,
    })
}

#[utoipa::path(
    get,
    path = "/clients",
    responses(
        (status = 200, description = "Clients of the authenticated principal, newest first"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "clients"
)]
pub async fn list_clients(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<ItemsResponse<Client>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let items = sqlx::query_as::<_, Client>(
        r"
        SELECT id, user_id, name, contact, source, created_at
        FROM clients
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
    path = "/clients",
    responses(
        (status = 200, description = "Created client"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "clients"
)]
pub async fn create_client(
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<Client>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let data = parse_client_input(&body)?;

    let item = sqlx::query_as::<_, Client>(
        r"
        INSERT INTO clients (user_id, name, contact, source)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, name, contact, source, created_at
        ",
    )
    .bind(user.id)
    .bind(&data.name)
    .bind(&data.contact)
    .bind(&data.source)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    patch,
    path = "/clients/{id}",
    params(("id" = String, Path, description = "Client id")),
    responses(
        (status = 200, description = "Updated client"),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Client absent or owned by another principal"),
    ),
    tag = "clients"
)]
pub async fn update_client(
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
    Json(body): Json<Value>,
) -> Result<Json<ItemResponse<Client>>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;
    let patch = parse_client_patch(&body)?;

    let current = ensure_client_owned(&pool, &client_id, user.id).await?;

    let name = patch.name.unwrap_or(current.name);
    let contact = patch.contact.unwrap_or(current.contact);
    let source = patch.source.unwrap_or(current.source);

    let item = sqlx::query_as::<_, Client>(
        r"
        UPDATE clients
        SET name = $1, contact = $2, source = $3
        WHERE id = $4
        RETURNING id, user_id, name, contact, source, created_at
        ",
    )
    .bind(&name)
    .bind(&contact)
    .bind(&source)
    .bind(current.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(ItemResponse { item }))
}

#[utoipa::path(
    delete,
    path = "/clients/{id}",
    params(("id" = String, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Client absent or owned by another principal"),
    ),
    tag = "clients"
)]
pub async fn delete_client(
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AuthConfig>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_current_user(&headers, &pool, &config).await?;

    let client = ensure_client_owned(&pool, &client_id, user.id).await?;

    sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(client.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_requires_name() {
        assert!(parse_client_input(&json!({ "contact": "@a" })).is_err());
        let input = parse_client_input(&json!({ "name": "Acme", "source": null })).expect("valid");
        assert_eq!(input.name, "Acme");
        assert_eq!(input.contact, None);
        assert_eq!(input.source, None);
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch =
            parse_client_patch(&json!({ "contact": null, "name": "New Name" })).expect("valid");
        assert_eq!(patch.name.as_deref(), Some("New Name"));
        assert_eq!(patch.contact, Some(None));
        assert_eq!(patch.source, None);
    }

    #[test]
    fn patch_rejects_empty_name() {
        assert!(parse_client_patch(&json!({ "name": "" })).is_err());
    }
}
