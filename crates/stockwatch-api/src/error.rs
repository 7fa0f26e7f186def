//! 통합 API 에러 응답 타입.
//!
//! 모든 REST 엔드포인트에서 일관된 에러 형식을 제공합니다.
//! 와이어 형식은 `{"error": "..."}` 이고, rate limit 응답에만
//! `retryAfter` 필드가 추가됩니다.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use stockwatch_data::QuoteError;

use crate::store::StoreError;

/// API 에러.
///
/// 분류는 스펙의 에러 택소노미를 따릅니다:
/// 검증(400) / 인증(401) / 권한(403) / 없음(404) / rate limit(429) /
/// 업스트림·저장소·내부(500).
#[derive(Debug, Error)]
pub enum ApiError {
    /// 요청 형식/파라미터 검증 실패
    #[error("{0}")]
    Validation(String),

    /// 인증 정보 없음 또는 무효
    #[error("Authentication required")]
    Unauthorized,

    /// 인증은 됐지만 대상 리소스 접근 권한 없음
    #[error("Unauthorized access")]
    Forbidden,

    /// 리소스 없음
    #[error("{0}")]
    NotFound(String),

    /// Rate limit 초과
    #[error("Rate limit exceeded")]
    RateLimited {
        /// 재시도까지 대기 시간 (초)
        retry_after: u64,
    },

    /// 업스트림 시세 소스 실패 (핸들러가 만든 일반 메시지)
    #[error("{0}")]
    Upstream(String),

    /// 저장소 사용 불가
    #[error("Database connection not available")]
    Store(#[from] StoreError),

    /// 내부 오류. 상세는 서버 로그에만 남기고 클라이언트에는
    /// 일반 메시지만 반환합니다.
    #[error("Internal server error occurred")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 에러 응답 바디.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 에러 메시지
    pub error: String,
    /// 재시도까지 대기 시간 (초, rate limit 응답에만 포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, retry_after) = match &self {
            ApiError::RateLimited { retry_after } => (self.to_string(), Some(*retry_after)),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                (self.to_string(), None)
            }
            ApiError::Store(source) => {
                tracing::error!(error = %source, "Store error");
                (self.to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let body = Json(ErrorBody {
            error: message,
            retry_after,
        });

        let mut response = (status, body).into_response();

        if let Some(secs) = retry_after {
            if let Ok(value) = header::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::NoData(symbol) => {
                ApiError::NotFound(format!("No data available for {}", symbol))
            }
            other => {
                tracing::warn!(error = %other, "Quote source failure");
                ApiError::Upstream("Failed to fetch market data".to_string())
            }
        }
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;
