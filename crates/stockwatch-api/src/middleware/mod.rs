//! API 서버용 HTTP middleware.
//!
//! 요청 처리 파이프라인에 적용되는 middleware 모듈.
//! 적용 순서: 검증(핸들러/추출기) → 인증 → rate limit → 핸들러 본문.

mod metrics;
mod rate_limit;
mod security;

pub use metrics::metrics_layer;
pub use rate_limit::{
    extract_client_ip, rate_limit_middleware, LimitClass, Quota, RateLimitDecision,
    RateLimitState, RateLimiter, SharedRateLimiter,
};
pub use security::security_headers;
