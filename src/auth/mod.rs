//! Identity verification and authorization core.
//!
//! Nothing in this module stores credential state: platform assertions and
//! session tokens are verified from their own bytes plus the configured
//! secrets, and the only persistent artifact is the `users` row a verified
//! identity maps to. Route handlers receive a resolved [`principal::User`]
//! and enforce per-resource ownership separately.

pub mod error;
pub mod init_data;
pub mod principal;
pub mod resolver;
pub mod session_token;

pub use error::AuthError;
pub use principal::{PublicUser, User};
pub use resolver::{require_current_user, ResolveError};
