//! Login token verification
//!
//! The authentication service issues HS256-signed tokens carrying the user id
//! and the username as the subject. Decoding happens once per session, right
//! after login; a token that fails verification leaves the session without an
//! identity but does not abort it.

use crate::error::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a login token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User identifier assigned by the authentication service
    #[serde(default)]
    pub id: Option<String>,

    /// Subject: the username the token was issued to
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiry, seconds since the epoch
    pub exp: u64,
}

/// Verify and decode a login token with the shared HS256 key.
///
/// Signature and expiry are both enforced, matching what the services
/// themselves do with the same key.
pub fn decode_token(token: &str, key: &str) -> Result<TokenClaims> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)?;
    Ok(data.claims)
}


#[cfg(test)]
mod tests {
    use super::test_support::{issue_expired_token, issue_token};
    use super::*;
    use crate::config::DEFAULT_TOKEN_KEY;

    #[test]
    fn test_roundtrip_decode() {
        let token = issue_token("abc123", "testuser", DEFAULT_TOKEN_KEY);
        let claims = decode_token(&token, DEFAULT_TOKEN_KEY).unwrap();
        assert_eq!(claims.id.as_deref(), Some("abc123"));
        assert_eq!(claims.sub.as_deref(), Some("testuser"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = issue_token("abc123", "testuser", DEFAULT_TOKEN_KEY);
        assert!(decode_token(&token, "some-other-key").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_expired_token("abc123", "testuser", DEFAULT_TOKEN_KEY);
        assert!(decode_token(&token, DEFAULT_TOKEN_KEY).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_token("not-a-token", DEFAULT_TOKEN_KEY).is_err());
    }
}
