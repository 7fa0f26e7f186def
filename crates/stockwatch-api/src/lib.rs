//! REST API 및 WebSocket 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (시세/검색/포트폴리오/관심종목)
//! - 실시간 가격 스트림을 위한 WebSocket 서버
//! - 구독 레지스트리 + 주기적 리프레시 루프 + 필터링 브로드캐스트
//! - 클래스별 rate limiting
//! - Prometheus 메트릭, OpenAPI 문서
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰 검증 collaborator 및 추출기
//! - [`realtime`]: 구독/리프레시/브로드캐스트 엔진
//! - [`store`]: 포트폴리오/관심종목 저장소 collaborator
//! - [`middleware`]: rate limit, 메트릭, 보안 헤더
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use auth::{IdentityProvider, JwtVerifier, SharedIdentityProvider};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use metrics::setup_metrics_recorder;
pub use middleware::{
    metrics_layer, rate_limit_middleware, security_headers, LimitClass, RateLimiter,
};
pub use openapi::{swagger_ui_router, ApiDoc};
pub use realtime::{
    websocket_handler, ClientEvent, PriceRefresher, RefresherHandle, ServerEvent,
    SubscriptionRegistry,
};
pub use routes::create_api_router;
pub use state::AppState;
pub use store::{MemoryStore, PortfolioStore, SharedStore};
