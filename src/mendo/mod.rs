use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{delete, get, patch, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cli::globals::AuthConfig;

pub mod access;
pub mod error;
pub mod handlers;
pub mod models;
pub mod validate;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::telegram_auth,
        handlers::auth::me,
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::update_order_status,
        handlers::order_details::list_tasks,
        handlers::order_details::create_task,
        handlers::order_details::update_task,
        handlers::order_details::list_notes,
        handlers::order_details::create_note,
        handlers::order_details::delete_note,
        handlers::reminders::list_reminders,
        handlers::reminders::create_reminder,
        handlers::reminders::update_reminder,
        handlers::reminders::delete_reminder,
        handlers::templates::list_templates,
        handlers::templates::create_template,
        handlers::templates::update_template,
        handlers::templates::delete_template,
        handlers::dashboard::summary,
    ),
    components(schemas(
        crate::auth::PublicUser,
        handlers::auth::AuthResponse,
        handlers::auth::MeResponse,
        handlers::dashboard::DashboardSummary,
        handlers::dashboard::UpcomingDeadline,
        models::OrderStatus,
        models::Client,
        models::Order,
        models::OrderWithClient,
        models::Task,
        models::OrderNote,
        models::Reminder,
        models::OrderRef,
        models::ReminderWithOrder,
        models::MessageTemplate,
    )),
    tags(
        (name = "auth", description = "Telegram Mini App authentication"),
        (name = "clients", description = "Client management"),
        (name = "orders", description = "Order management"),
        (name = "tasks", description = "Order tasks"),
        (name = "notes", description = "Order notes"),
        (name = "reminders", description = "Order reminders"),
        (name = "templates", description = "Message templates"),
        (name = "dashboard", description = "Dashboard aggregation"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server.
///
/// # Errors
///
/// Returns an error if the database pool or the listener cannot be set up.
pub async fn new(port: u16, dsn: String, config: AuthConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let config = Arc::new(config);

    let cors = CorsLayer::new()
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(Any);

    let app = Router::new()
        .route("/auth/telegram", post(handlers::auth::telegram_auth))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:id",
            patch(handlers::clients::update_client).delete(handlers::clients::delete_client),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .patch(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/status", post(handlers::orders::update_order_status))
        .route(
            "/orders/:id/tasks",
            get(handlers::order_details::list_tasks).post(handlers::order_details::create_task),
        )
        .route("/tasks/:id", patch(handlers::order_details::update_task))
        .route(
            "/orders/:id/notes",
            get(handlers::order_details::list_notes).post(handlers::order_details::create_note),
        )
        .route("/notes/:id", delete(handlers::order_details::delete_note))
        .route(
            "/reminders",
            get(handlers::reminders::list_reminders).post(handlers::reminders::create_reminder),
        )
        .route(
            "/reminders/:id",
            patch(handlers::reminders::update_reminder)
                .delete(handlers::reminders::delete_reminder),
        )
        .route(
            "/templates",
            get(handlers::templates::list_templates).post(handlers::templates::create_template),
        )
        .route(
            "/templates/:id",
            patch(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        )
        .route("/dashboard/summary", get(handlers::dashboard::summary))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(pool.clone()))
                .layer(Extension(config.clone())),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(pool))
        .layer(Extension(config));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
