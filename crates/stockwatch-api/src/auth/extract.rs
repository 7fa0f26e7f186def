//! Axum용 인증 추출기.
//!
//! `Authorization: Bearer <token>` 헤더에서 토큰을 꺼내
//! AppState의 identity provider로 검증합니다.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use std::sync::Arc;

use super::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Authorization 헤더에서 Bearer 토큰 추출.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// 인증 필수 추출기.
///
/// 토큰이 없거나 검증에 실패하면 401을 반환합니다.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireIdentity(user): RequireIdentity,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let user = state.identity.verify(token).await.map_err(|e| {
            tracing::warn!(error = %e, "Token verification failed");
            ApiError::Unauthorized
        })?;

        Ok(RequireIdentity(user))
    }
}

/// 선택적 인증 추출기.
///
/// 토큰이 있으면 검증하고, 없거나 무효면 None을 반환합니다.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<AuthUser>);

impl FromRequestParts<Arc<AppState>> for OptionalIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match RequireIdentity::from_request_parts(parts, state).await {
            Ok(RequireIdentity(user)) => Ok(OptionalIdentity(Some(user))),
            Err(_) => Ok(OptionalIdentity(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);
    }
}
