//! 헬스 체크 endpoint.
//!
//! 로드밸런서/오케스트레이션 시스템용 상태 확인.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 서비스 상태
    pub status: String,
    /// 현재 시간 (ISO 8601)
    pub timestamp: String,
    /// 구독자가 있는 심볼 수
    pub active_subscriptions: usize,
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: i64,
}

/// GET /health - 헬스 체크.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "서비스 상태", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        active_subscriptions: state.registry.active_symbol_count().await,
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_shape() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .route("/health", get(health_check))
            .with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(health.status, "healthy");
        assert_eq!(health.active_subscriptions, 0);
        assert!(!health.version.is_empty());

        // 와이어 형식은 camelCase
        let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(raw.get("activeSubscriptions").is_some());
    }
}
