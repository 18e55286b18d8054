//! Stateless session tokens.
//!
//! After the first login the client holds a compact bearer credential:
//! `base64url(JSON payload) . base64url(HMAC-SHA256 signature)`. Nothing is
//! stored server-side; validity is recomputed from the signature and the
//! embedded expiry on every request. The signature covers the encoded
//! payload and is checked before the payload is parsed, so unauthenticated
//! bytes are never fed to the JSON decoder.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokenPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

fn sign_payload(secret: &str, encoded_payload: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(encoded_payload.as_bytes());
    Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes())
}

/// Issue a token binding `user_id` to an expiry `ttl_seconds` from `now_unix`.
///
/// # Errors
///
/// Returns an error only if the payload cannot be encoded as JSON.
pub fn issue(
    user_id: &str,
    secret: &str,
    ttl_seconds: i64,
    now_unix: i64,
) -> Result<String, AuthError> {
    let payload = SessionTokenPayload {
        user_id: user_id.to_string(),
        iat: now_unix,
        exp: now_unix + ttl_seconds,
    };

    let json = serde_json::to_vec(&payload)?;
    let encoded_payload = Base64UrlUnpadded::encode_string(&json);
    let signature = sign_payload(secret, &encoded_payload);

    Ok(format!("{encoded_payload}.{signature}"))
}

/// Verify a token and return its decoded payload.
///
/// # Errors
///
/// Returns an [`AuthError`] when the token does not have exactly two
/// segments, the signature does not match (constant-time comparison,
/// length mismatches included), the payload is not the expected JSON
/// shape, or the expiry has passed.
pub fn verify(token: &str, secret: &str, now_unix: i64) -> Result<SessionTokenPayload, AuthError> {
    let mut parts = token.split('.');
    let encoded_payload = parts.next().ok_or(AuthError::TokenFormat)?;
    let signature = parts.next().ok_or(AuthError::TokenFormat)?;
    if parts.next().is_some() || encoded_payload.is_empty() || signature.is_empty() {
        return Err(AuthError::TokenFormat);
    }

    let supplied =
        Base64UrlUnpadded::decode_vec(signature).map_err(|_| AuthError::TokenSignature)?;
    // HMAC accepts keys of any length
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(encoded_payload.as_bytes());
    mac.verify_slice(&supplied)
        .map_err(|_| AuthError::TokenSignature)?;

    let payload_bytes =
        Base64UrlUnpadded::decode_vec(encoded_payload).map_err(|_| AuthError::TokenPayload)?;
    let payload: SessionTokenPayload =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::TokenPayload)?;

    if payload.user_id.trim().is_empty() {
        return Err(AuthError::TokenPayload);
    }

    if payload.exp <= now_unix {
        return Err(AuthError::TokenExpired);
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret";
    const NOW: i64 = 1_700_000_000;
    const TTL: i64 = 604_800;

    #[test]
    fn round_trip() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let payload = verify(&token, SECRET, NOW).expect("verify");
        assert_eq!(payload.user_id, "user-1");
        assert_eq!(payload.iat, NOW);
        assert_eq!(payload.exp, NOW + TTL);
    }

    #[test]
    fn rejects_after_expiry() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let result = verify(&token, SECRET, NOW + TTL);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let result = verify(&token, "another-secret", NOW);
        assert!(matches!(result, Err(AuthError::TokenSignature)));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let (payload, signature) = token.split_once('.').expect("two segments");
        let mut chars: Vec<char> = payload.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        let result = verify(&format!("{tampered}.{signature}"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenSignature)));
    }

    #[test]
    fn rejects_tampered_signature() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let (payload, signature) = token.split_once('.').expect("two segments");
        let mut chars: Vec<char> = signature.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        let result = verify(&format!("{payload}.{tampered}"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenSignature)));
    }

    #[test]
    fn rejects_extra_segment() {
        let token = issue("user-1", SECRET, TTL, NOW).expect("issue");
        let result = verify(&format!("{token}.extra"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenFormat)));
    }

    #[test]
    fn rejects_missing_delimiter() {
        let result = verify("no-delimiter-here", SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenFormat)));
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(matches!(
            verify(".signature", SECRET, NOW),
            Err(AuthError::TokenFormat)
        ));
        assert!(matches!(
            verify("payload.", SECRET, NOW),
            Err(AuthError::TokenFormat)
        ));
    }

    #[test]
    fn rejects_forged_payload_with_valid_shape() {
        // A well-formed payload signed with the wrong key must not pass.
        let json = serde_json::to_vec(&SessionTokenPayload {
            user_id: "user-2".to_string(),
            iat: NOW,
            exp: NOW + TTL,
        })
        .expect("encode");
        let encoded = Base64UrlUnpadded::encode_string(&json);
        let forged_signature = sign_payload("attacker-secret", &encoded);
        let result = verify(&format!("{encoded}.{forged_signature}"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenSignature)));
    }

    #[test]
    fn rejects_blank_user_id() {
        let json = serde_json::to_vec(&SessionTokenPayload {
            user_id: "  ".to_string(),
            iat: NOW,
            exp: NOW + TTL,
        })
        .expect("encode");
        let encoded = Base64UrlUnpadded::encode_string(&json);
        let signature = sign_payload(SECRET, &encoded);
        let result = verify(&format!("{encoded}.{signature}"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenPayload)));
    }

    #[test]
    fn rejects_non_json_payload() {
        let encoded = Base64UrlUnpadded::encode_string(b"not json");
        let signature = sign_payload(SECRET, &encoded);
        let result = verify(&format!("{encoded}.{signature}"), SECRET, NOW);
        assert!(matches!(result, Err(AuthError::TokenPayload)));
    }
}
