//! HTTP error surface.
//!
//! The taxonomy is deliberately small: 400 for caller-fixable input, 401 for
//! every credential failure (one generic body, the variant detail goes to the
//! log), 404 for a resource that is absent *or* owned by someone else (the
//! two are indistinguishable on purpose), 500 for storage and other internal
//! failures with details kept server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, error};

use crate::auth::{AuthError, ResolveError};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(AuthError),
    NotFound(&'static str),
    Database(sqlx::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Auth(auth) => Self::Unauthorized(auth),
            ResolveError::Database(db) => Self::Database(db),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),
            Self::Unauthorized(err) => {
                // Variant detail is logged; the client sees one generic body
                // for every credential failure.
                debug!("Unauthorized request: {err}");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Not authenticated" })),
                )
                    .into_response()
            }
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message })),
            )
                .into_response(),
            Self::Database(err) => {
                error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_variants_share_one_status() {
        for err in [
            AuthError::MissingHash,
            AuthError::InvalidSignature,
            AuthError::TokenExpired,
            AuthError::NoCredentials,
        ] {
            let response = ApiError::Unauthorized(err).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::bad_request("Field 'name' cannot be empty")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("Client not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
