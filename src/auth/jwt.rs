//! Bearer token issue and verification (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Role, User},
    error::{AppError, Result},
};

/// Identity carried by a bearer token. The role is a snapshot taken at
/// issue time; authorization decisions that matter re-read the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_trainer(&self) -> bool {
        self.role == Role::Trainer
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        self.issue_with_ttl(user, self.ttl)
    }

    pub(crate) fn issue_with_ttl(&self, user: &User, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
    }

    /// Decode and validate a token. Any failure, expiry included, is
    /// reported as an invalid token.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                AppError::invalid_token()
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: 42,
            email: "member@fitmat.test".to_string(),
            name: Some("Member".to_string()),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let service = TokenService::new("test-secret", 2);
        let token = service.issue(&user(Role::UserGold)).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "member@fitmat.test");
        assert_eq!(claims.role, Role::UserGold);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_invalid() {
        let service = TokenService::new("test-secret", 2);
        let token = service
            .issue_with_ttl(&user(Role::User), Duration::hours(-1))
            .unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid token."));
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let issuer = TokenService::new("one-secret", 2);
        let verifier = TokenService::new("other-secret", 2);
        let token = issuer.issue(&user(Role::Admin)).unwrap();

        assert!(verifier.verify(&token).is_err());
        assert!(verifier.verify("not.a.token").is_err());
    }

    #[test]
    fn staff_helpers() {
        let service = TokenService::new("test-secret", 2);
        let admin = service.verify(&service.issue(&user(Role::Admin)).unwrap()).unwrap();
        let trainer = service.verify(&service.issue(&user(Role::Trainer)).unwrap()).unwrap();

        assert!(admin.is_admin() && !admin.is_trainer());
        assert!(trainer.is_trainer() && !trainer.is_admin());
    }
}
