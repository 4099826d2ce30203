//! JWT access tokens for the API's bearer authentication.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("Access token expired")]
    Expired,

    #[error("Invalid access token")]
    Invalid,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: Uuid,
    pub username: String,
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: u64,
    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: u64,
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_secs: u64,
}

impl TokenManager {
    pub fn new(jwt_secret: &str, expiry_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            expiry_secs: expiry_minutes * 60,
        }
    }

    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<String, TokenError> {
        let now = unix_now();

        let claims = AccessClaims {
            sub: user_id,
            username: username.to_string(),
            exp: now + self.expiry_secs,
            iat: now,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let validation = Validation::default();
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        Ok(token_data.claims)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_round_trip() {
        let manager = TokenManager::new("test-secret", 60);
        let user_id = Uuid::new_v4();
        let token = manager.issue(user_id, "alice").unwrap();

        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = TokenManager::new("test-secret", 60);
        let now = unix_now();

        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            username: "alice".to_string(),
            exp: now - 100,
            iat: now - 200,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        let result = manager.verify(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let manager = TokenManager::new("test-secret", 60);
        let result = manager.verify("not-a-token");
        assert!(matches!(result, Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let manager1 = TokenManager::new("secret1", 60);
        let manager2 = TokenManager::new("secret2", 60);

        let token = manager1.issue(Uuid::new_v4(), "alice").unwrap();
        let result = manager2.verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid)));
    }
}
