use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens that carry only a username.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, username: &str) -> Result<String, AppError> {
        self.issue_at(username, Utc::now())
    }

    pub fn issue_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: username.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::Internal(format!("failed to sign token: {err}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                AppError::Unauthorized
            })
    }
}

#[cfg(test)]
mod tests {
    use super::TokenService;
    use crate::error::AppError;
    use chrono::{Duration, Utc};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn fresh_token_carries_username() {
        let service = TokenService::new(SECRET, 60);
        let token = service.issue("agent1").unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, "agent1");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new(SECRET, 60);
        let token = service
            .issue_at("agent1", Utc::now() - Duration::minutes(61))
            .unwrap();

        assert!(matches!(service.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new(b"another-secret-another-secret-xx", 60);
        let verifier = TokenService::new(SECRET, 60);
        let token = issuer.issue("agent1").unwrap();

        assert!(matches!(verifier.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let service = TokenService::new(SECRET, 60);
        assert!(matches!(service.verify("abc"), Err(AppError::Unauthorized)));
    }
}
