//! Per-resource ownership checks.
//!
//! Every read or mutation of an owned resource goes through one of these
//! guards first. A resource that does not exist and a resource owned by a
//! different principal produce the same `NotFound`, so callers cannot probe
//! for foreign ids. Clients, orders and templates carry `user_id` directly
//! and are filtered in the query; tasks, reminders and notes resolve their
//! owning order and the comparison happens here.

use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::{
    error::ApiError,
    models::{Client, MessageTemplate, Order, OrderNote, Reminder, Task},
};

/// Parse a client-supplied resource id.
///
/// An unparseable id behaves exactly like an unknown one.
fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found))
}

pub async fn ensure_client_owned(
    pool: &PgPool,
    client_id: &str,
    user_id: Uuid,
) -> Result<Client, ApiError> {
    let client_id = parse_id(client_id, "Client not found")?;
    sqlx::query_as::<_, Client>(
        r"
        SELECT id, user_id, name, contact, source, created_at
        FROM clients
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(client_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Client not found"))
}

pub async fn ensure_order_owned(
    pool: &PgPool,
    order_id: &str,
    user_id: Uuid,
) -> Result<Order, ApiError> {
    let order_id = parse_id(order_id, "Order not found")?;
    sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, client_id, title, budget, status, deadline, created_at, updated_at
        FROM orders
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Order not found"))
}

pub async fn ensure_template_owned(
    pool: &PgPool,
    template_id: &str,
    user_id: Uuid,
) -> Result<MessageTemplate, ApiError> {
    let template_id = parse_id(template_id, "Template not found")?;
    sqlx::query_as::<_, MessageTemplate>(
        r"
        SELECT id, user_id, title, body, created_at
        FROM message_templates
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(template_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Template not found"))
}

/// Tasks are owned through their order: the whole chain is resolved, not
/// just the immediate parent.
pub async fn ensure_task_owned(
    pool: &PgPool,
    task_id: &str,
    user_id: Uuid,
) -> Result<Task, ApiError> {
    let task_id = parse_id(task_id, "Task not found")?;
    let row = sqlx::query(
        r"
        SELECT t.id, t.order_id, t.title, t.done, t.position, t.created_at,
               o.user_id AS owner_id
        FROM tasks t
        JOIN orders o ON o.id = t.order_id
        WHERE t.id = $1
        ",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::NotFound("Task not found"));
    };
    let owner_id: Uuid = row.try_get("owner_id")?;
    if owner_id != user_id {
        return Err(ApiError::NotFound("Task not found"));
    }
    Ok(Task::from_row(&row)?)
}

pub async fn ensure_reminder_owned(
    pool: &PgPool,
    reminder_id: &str,
    user_id: Uuid,
) -> Result<Reminder, ApiError> {
    let reminder_id = parse_id(reminder_id, "Reminder not found")?;
    let row = sqlx::query(
        r"
        SELECT r.id, r.order_id, r.remind_at, r.sent, r.channel, r.created_at,
               o.user_id AS owner_id
        FROM reminders r
        JOIN orders o ON o.id = r.order_id
        WHERE r.id = $1
        ",
    )
    .bind(reminder_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::NotFound("Reminder not found"));
    };
    let owner_id: Uuid = row.try_get("owner_id")?;
    if owner_id != user_id {
        return Err(ApiError::NotFound("Reminder not found"));
    }
    Ok(Reminder::from_row(&row)?)
}

pub async fn ensure_note_owned(
    pool: &PgPool,
    note_id: &str,
    user_id: Uuid,
) -> Result<OrderNote, ApiError> {
    let note_id = parse_id(note_id, "Note not found")?;
    let row = sqlx::query(
        r"
        SELECT n.id, n.order_id, n.text, n.created_at,
               o.user_id AS owner_id
        FROM order_notes n
        JOIN orders o ON o.id = n.order_id
        WHERE n.id = $1
        ",
    )
    .bind(note_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::NotFound("Note not found"));
    };
    let owner_id: Uuid = row.try_get("owner_id")?;
    if owner_id != user_id {
        return Err(ApiError::NotFound("Note not found"));
    }
    Ok(OrderNote::from_row(&row)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_id_is_not_found() {
        let result = parse_id("not-a-uuid", "Client not found");
        assert!(matches!(result, Err(ApiError::NotFound("Client not found"))));
    }

    #[test]
    fn valid_id_parses() {
        let id = parse_id(" 00000000-0000-0000-0000-000000000001 ", "Client not found")
            .expect("valid uuid");
        assert_eq!(id, Uuid::from_u128(1));
    }
}
