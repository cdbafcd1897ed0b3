//! Stateless session tokens
//!
//! Tokens are JWTs signed with a shared secret (HS256), binding a user id
//! to an expiry. Validity is determined purely by signature and expiry at
//! verification time; nothing is persisted server-side.

use crate::config::AuthConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

/// Errors from signing or verifying a token
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired. Please log in again.")]
    Expired,

    #[error("Invalid token. Please log in again.")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to sign token")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

/// Mints and verifies session tokens
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl_secs: config.token_ttl_secs,
        }
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mint a token bound to a user id
    pub fn sign(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
        };

        let header = Header {
            alg: jsonwebtoken::Algorithm::HS256,
            ..Default::default()
        };

        encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(TokenError::Sign)
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl_secs: i64) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: ttl_secs,
        })
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let issuer = issuer(3600);
        let user_id = Uuid::new_v4();

        let token = issuer.sign(user_id).expect("sign");
        let claims = issuer.verify(&token).expect("verify");

        assert_eq!(claims.sub, user_id.to_string());
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signer = issuer(3600);
        let verifier = TokenIssuer::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            token_ttl_secs: 3600,
        });

        let token = signer.sign(Uuid::new_v4()).expect("sign");
        assert!(matches!(
            verifier.verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        // Issued already past its expiry (beyond the default leeway)
        let issuer = issuer(-120);
        let token = issuer.sign(Uuid::new_v4()).expect("sign");
        assert!(matches!(issuer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let issuer = issuer(3600);
        assert!(matches!(
            issuer.verify("not-a-token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
