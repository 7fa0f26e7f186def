//! JWT 토큰 검증.
//!
//! HS256 서명 토큰의 `sub` 클레임을 사용자 ID로 사용합니다.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthUser, IdentityProvider};

/// JWT 페이로드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// 새로운 Claims 생성.
    pub fn new(user_id: impl Into<String>, expires_in_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(expires_in_minutes)).timestamp(),
        }
    }
}

/// 토큰 생성.
///
/// 주로 테스트와 개발 툴링에서 사용합니다.
pub fn create_token(
    user_id: impl Into<String>,
    secret: &str,
    expires_in_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, expires_in_minutes);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// JWT 기반 identity provider.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    /// 서명 시크릿으로 검증기 생성.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        Ok(AuthUser {
            user_id: data.claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_round_trip() {
        let token = create_token("user-123", "test-secret", 60).unwrap();
        let verifier = JwtVerifier::new("test-secret");

        let user = verifier.verify(&token).await.unwrap();
        assert_eq!(user.user_id, "user-123");
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let token = create_token("user-123", "test-secret", 60).unwrap();
        let verifier = JwtVerifier::new("other-secret");

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let token = create_token("user-123", "test-secret", -10).unwrap();
        let verifier = JwtVerifier::new("test-secret");

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let verifier = JwtVerifier::new("test-secret");
        assert!(verifier.verify("not-a-token").await.is_err());
    }
}
