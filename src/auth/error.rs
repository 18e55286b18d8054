use thiserror::Error;

/// Failures of the credential verification paths.
///
/// Every variant surfaces to the client as the same generic 401; the variant
/// message exists for server-side logs only.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing telegram hash")]
    MissingHash,
    #[error("invalid telegram signature")]
    InvalidSignature,
    #[error("missing telegram auth_date")]
    MissingAuthDate,
    #[error("invalid telegram auth_date")]
    InvalidAuthDate,
    #[error("telegram auth data is expired")]
    AssertionExpired,
    #[error("missing telegram user data")]
    MissingUser,
    #[error("invalid telegram user payload")]
    InvalidUser,
    #[error("bot token is not configured")]
    BotTokenNotConfigured,
    #[error("invalid auth token format")]
    TokenFormat,
    #[error("invalid auth token signature")]
    TokenSignature,
    #[error("invalid auth token payload")]
    TokenPayload,
    #[error("auth token is expired")]
    TokenExpired,
    #[error("user not found for auth token")]
    PrincipalNotFound,
    #[error("unauthorized request")]
    NoCredentials,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}
