//! 인증.
//!
//! 토큰 검증은 외부 identity provider collaborator에 위임합니다.
//! 기본 구현은 JWT([`JwtVerifier`])이며, 테스트에서는 고정 토큰 맵으로
//! 대체할 수 있습니다.
//!
//! # 구성 요소
//!
//! - [`IdentityProvider`]: `verify(token) -> user id` capability
//! - [`JwtVerifier`]: jsonwebtoken 기반 구현
//! - [`RequireIdentity`] / [`OptionalIdentity`]: Axum 추출기

mod extract;
mod jwt;

pub use extract::{bearer_token, OptionalIdentity, RequireIdentity};
pub use jwt::{create_token, Claims, JwtVerifier};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 인증된 사용자.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// 사용자 ID
    pub user_id: String,
}

/// 토큰 검증 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// 외부 identity provider.
///
/// 토큰을 검증하고 사용자 ID를 반환합니다. 검증 프로토콜 내부는
/// 이 서비스의 관심사가 아닙니다.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 토큰 검증.
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// 공유 가능한 identity provider 타입.
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;
