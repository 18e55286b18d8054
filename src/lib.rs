//! # Mendo
//!
//! `mendo` is the backend of an order and client management app whose web
//! client runs inside a Telegram Mini App. It tracks clients, orders and
//! their tasks, notes, reminders and message templates for a single
//! freelancer or small team per account.
//!
//! ## Identity
//!
//! Authentication starts from a Telegram Mini App `initData` assertion
//! verified offline against the bot token; from there the service issues its
//! own stateless, HMAC-signed session tokens. No credential is ever stored
//! server-side.
//!
//! ## Ownership
//!
//! Every resource belongs to exactly one principal, directly or through its
//! parent order. Requests against resources of other principals return
//! `404 Not Found` rather than `403 Forbidden` to prevent resource
//! enumeration.

pub mod auth;
pub mod cli;
pub mod mendo;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
