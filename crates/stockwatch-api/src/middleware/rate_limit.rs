//! Rate limiting middleware.
//!
//! (클래스, 식별자)별 슬라이딩 윈도우 방식의 admission control.
//! 호출마다 윈도우 밖의 타임스탬프를 정리한 뒤 허용량과 비교합니다.
//! 식별자는 인증된 사용자 ID가 있으면 그것을, 없으면 클라이언트 IP를
//! 사용합니다.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::auth::{bearer_token, SharedIdentityProvider};
use crate::error::ApiError;

/// Rate limit 클래스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    /// 일반 REST 요청: 60회 / 60초
    Default,
    /// 인증 사용자 REST 요청: 120회 / 60초
    Authenticated,
    /// 실시간 구독 이벤트: 10회 / 10초
    Realtime,
}

impl LimitClass {
    /// 클래스별 기본 허용량.
    pub fn quota(&self) -> Quota {
        match self {
            LimitClass::Default => Quota {
                max_requests: 60,
                window: Duration::from_secs(60),
            },
            LimitClass::Authenticated => Quota {
                max_requests: 120,
                window: Duration::from_secs(60),
            },
            LimitClass::Realtime => Quota {
                max_requests: 10,
                window: Duration::from_secs(10),
            },
        }
    }

    /// 메트릭 라벨.
    pub fn as_label(&self) -> &'static str {
        match self {
            LimitClass::Default => "default",
            LimitClass::Authenticated => "authenticated",
            LimitClass::Realtime => "realtime",
        }
    }
}

/// 허용량: 윈도우당 최대 요청 수.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    /// 최대 요청 수
    pub max_requests: usize,
    /// 윈도우 길이
    pub window: Duration,
}

/// Rate limit 확인 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// 요청 허용됨
    Allowed,
    /// Rate limit 초과
    Limited {
        /// 재시도까지 대기 시간 (초) - 윈도우 길이와 같음
        retry_after: u64,
    },
}

/// 슬라이딩 윈도우 rate limiter.
///
/// (클래스, 식별자)별로 요청 시각 목록을 유지합니다. 정리 후 목록
/// 길이는 절대 클래스 최대치를 넘지 않습니다.
pub struct RateLimiter {
    windows: RwLock<HashMap<(LimitClass, String), Vec<Instant>>>,
    overrides: HashMap<LimitClass, Quota>,
}

impl RateLimiter {
    /// 기본 클래스 허용량으로 생성.
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            overrides: HashMap::new(),
        }
    }

    /// 특정 클래스의 허용량을 오버라이드 (운영 튜닝/테스트용).
    pub fn with_quota(mut self, class: LimitClass, quota: Quota) -> Self {
        self.overrides.insert(class, quota);
        self
    }

    fn quota_for(&self, class: LimitClass) -> Quota {
        self.overrides.get(&class).copied().unwrap_or(class.quota())
    }

    /// 요청 허용 여부 확인.
    ///
    /// 허용 시 현재 시각을 기록하고, 거부 시 아무것도 기록하지 않습니다.
    pub async fn check(&self, class: LimitClass, identifier: &str) -> RateLimitDecision {
        let quota = self.quota_for(class);
        let now = Instant::now();

        let mut windows = self.windows.write().await;
        let stamps = windows
            .entry((class, identifier.to_string()))
            .or_default();

        stamps.retain(|t| now.duration_since(*t) < quota.window);

        if stamps.len() >= quota.max_requests {
            RateLimitDecision::Limited {
                retry_after: quota.window.as_secs(),
            }
        } else {
            stamps.push(now);
            RateLimitDecision::Allowed
        }
    }

    /// 윈도우가 완전히 비워진 식별자 정리.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|(class, _), stamps| {
            let window = self.quota_for(*class).window;
            stamps.iter().any(|t| now.duration_since(*t) < window)
        });
        before - windows.len()
    }

    /// 현재 추적 중인 (클래스, 식별자) 수.
    pub async fn tracked_identifiers(&self) -> usize {
        self.windows.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// 공유 가능한 rate limiter 타입.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Rate limit 미들웨어 상태.
#[derive(Clone)]
pub struct RateLimitState {
    /// 이 라우터 그룹에 적용할 클래스
    pub class: LimitClass,
    /// 공유 limiter
    pub limiter: SharedRateLimiter,
    /// 식별자 결정용 identity provider
    pub identity: SharedIdentityProvider,
    /// 전체 비활성화 여부
    pub disabled: bool,
}

/// Rate limiting 미들웨어 함수.
///
/// 식별자 우선순위: 검증된 사용자 ID → 클라이언트 IP.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if state.disabled {
        return next.run(request).await;
    }

    let identifier = resolve_identifier(&state, &request).await;

    match state.limiter.check(state.class, &identifier).await {
        RateLimitDecision::Allowed => {
            counter!("rate_limit_requests_total", "class" => state.class.as_label(), "status" => "allowed")
                .increment(1);
            next.run(request).await
        }
        RateLimitDecision::Limited { retry_after } => {
            counter!("rate_limit_requests_total", "class" => state.class.as_label(), "status" => "limited")
                .increment(1);

            tracing::warn!(
                identifier = %identifier,
                class = state.class.as_label(),
                retry_after = retry_after,
                "Rate limit exceeded"
            );

            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}

/// 요청에서 rate limit 식별자 결정.
async fn resolve_identifier(state: &RateLimitState, request: &Request) -> String {
    // `Request<Body>`는 Sync가 아니므로 `&Request`를 await 경계 너머로
    // 유지할 수 없다. 필요한 값을 await 이전에 소유 형태로 추출한다.
    let token = bearer_token(request.headers()).map(str::to_owned);
    let client_ip = extract_client_ip(request);

    if let Some(token) = token {
        if let Ok(user) = state.identity.verify(&token).await {
            return user.user_id;
        }
    }
    client_ip.to_string()
}

/// 요청에서 클라이언트 IP 추출.
///
/// 프록시/로드밸런서 뒤에 있을 경우를 위해 X-Forwarded-For,
/// X-Real-IP 헤더를 우선 확인합니다.
pub fn extract_client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            // 첫 번째 IP가 클라이언트 원본
            if let Some(ip_str) = value.split(',').next() {
                if let Ok(ip) = ip_str.trim().parse() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse() {
                return ip;
            }
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    "127.0.0.1".parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_quota_then_denies() {
        let limiter = RateLimiter::new();
        let quota = LimitClass::Realtime.quota();

        for i in 0..quota.max_requests {
            let decision = limiter.check(LimitClass::Realtime, "client-1").await;
            assert_eq!(
                decision,
                RateLimitDecision::Allowed,
                "request {} should be allowed",
                i
            );
        }

        assert_eq!(
            limiter.check(LimitClass::Realtime, "client-1").await,
            RateLimitDecision::Limited {
                retry_after: quota.window.as_secs()
            }
        );
    }

    #[tokio::test]
    async fn test_window_expiry_allows_again() {
        let limiter = RateLimiter::new().with_quota(
            LimitClass::Realtime,
            Quota {
                max_requests: 2,
                window: Duration::from_millis(40),
            },
        );

        assert_eq!(
            limiter.check(LimitClass::Realtime, "c").await,
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check(LimitClass::Realtime, "c").await,
            RateLimitDecision::Allowed
        );
        assert!(matches!(
            limiter.check(LimitClass::Realtime, "c").await,
            RateLimitDecision::Limited { .. }
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(
            limiter.check(LimitClass::Realtime, "c").await,
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = RateLimiter::new().with_quota(
            LimitClass::Default,
            Quota {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );

        assert_eq!(
            limiter.check(LimitClass::Default, "a").await,
            RateLimitDecision::Allowed
        );
        assert!(matches!(
            limiter.check(LimitClass::Default, "a").await,
            RateLimitDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.check(LimitClass::Default, "b").await,
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_classes_are_independent() {
        let limiter = RateLimiter::new().with_quota(
            LimitClass::Default,
            Quota {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );

        assert_eq!(
            limiter.check(LimitClass::Default, "a").await,
            RateLimitDecision::Allowed
        );
        assert!(matches!(
            limiter.check(LimitClass::Default, "a").await,
            RateLimitDecision::Limited { .. }
        ));
        // 같은 식별자라도 다른 클래스는 별도 윈도우
        assert_eq!(
            limiter.check(LimitClass::Authenticated, "a").await,
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_denied_request_is_not_recorded() {
        let limiter = RateLimiter::new().with_quota(
            LimitClass::Realtime,
            Quota {
                max_requests: 1,
                window: Duration::from_millis(50),
            },
        );

        let _ = limiter.check(LimitClass::Realtime, "c").await;
        // 거부된 호출은 타임스탬프를 쌓지 않으므로 윈도우가 지나면 바로 허용
        for _ in 0..5 {
            let _ = limiter.check(LimitClass::Realtime, "c").await;
        }
        tokio::time::sleep(Duration::from_millis(70)).await;

        assert_eq!(
            limiter.check(LimitClass::Realtime, "c").await,
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_identifiers() {
        let limiter = RateLimiter::new().with_quota(
            LimitClass::Default,
            Quota {
                max_requests: 10,
                window: Duration::from_millis(20),
            },
        );

        let _ = limiter.check(LimitClass::Default, "idle").await;
        assert_eq!(limiter.tracked_identifiers().await, 1);

        tokio::time::sleep(Duration::from_millis(40)).await;

        let removed = limiter.sweep().await;
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_identifiers().await, 0);
    }

    #[test]
    fn test_class_quotas_match_policy() {
        let default = LimitClass::Default.quota();
        assert_eq!(default.max_requests, 60);
        assert_eq!(default.window, Duration::from_secs(60));

        let authenticated = LimitClass::Authenticated.quota();
        assert_eq!(authenticated.max_requests, 120);
        assert_eq!(authenticated.window, Duration::from_secs(60));

        let realtime = LimitClass::Realtime.quota();
        assert_eq!(realtime.max_requests, 10);
        assert_eq!(realtime.window, Duration::from_secs(10));
    }
}
