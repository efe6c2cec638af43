//! Signed bearer tokens.
//!
//! A token is `base64url(claims_json) "." hex(hmac_sha256(secret, base64url(claims_json)))`.
//! Claims carry the user id, their role and an expiry (unix seconds).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use bookstore_core::{Role, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("failed to encode claims: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What a verified token says about its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token for `user` valid until `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the claims can't be encoded or the key is unusable.
    pub fn issue(&self, user: UserId, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user,
            role,
            exp: (now + self.ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `Malformed`, `BadSignature` or `Expired`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let expected = self.sign(payload)?;
        if !constant_time_compare(&expected, signature) {
            return Err(TokenError::BadSignature);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("k8#Qz!v2Lr9@Wm4$Tx7&Hp1^Nc6*Bd3%"),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[test]
    fn test_issue_then_verify() {
        let now = Utc::now();
        let token = signer().issue(UserId::new(5), Role::Admin, now).unwrap();
        let claims = signer().verify(&token, now).unwrap();
        assert_eq!(claims.sub, UserId::new(5));
        assert!(claims.role.is_admin());
    }

    #[test]
    fn test_expired() {
        let now = Utc::now();
        let token = signer().issue(UserId::new(5), Role::User, now).unwrap();
        let later = now + Duration::hours(2);
        assert!(matches!(
            signer().verify(&token, later),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_tampered_role_is_rejected() {
        let now = Utc::now();
        let token = signer().issue(UserId::new(5), Role::User, now).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: UserId::new(5),
            role: Role::Admin,
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            signer().verify(&forged, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let now = Utc::now();
        let token = signer().issue(UserId::new(5), Role::User, now).unwrap();
        let other = TokenSigner::new(
            SecretString::from("Zq7!mW2@xR9#pL4$vN8%bT1^cK6&dH3*"),
            Duration::hours(1),
        );
        assert!(matches!(
            other.verify(&token, now),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            signer().verify("not-a-token", Utc::now()),
            Err(TokenError::Malformed)
        ));
    }
}
