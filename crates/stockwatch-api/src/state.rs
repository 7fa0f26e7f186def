//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 주입 가능한 collaborator들(시세 소스, 저장소, identity
//! provider)과 프로세스 전역 상태(레지스트리, 캐시, rate limiter)를
//! 한곳에 묶습니다. 프로세스 시작 시 생성되어 Arc로 핸들러와
//! 백그라운드 루프에 전달되므로, 테스트는 인스턴스를 새로 만들어
//! 격리할 수 있습니다.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use stockwatch_core::Settings;
use stockwatch_data::{SharedQuoteProvider, TtlCache};

use crate::auth::SharedIdentityProvider;
use crate::middleware::{LimitClass, RateLimitState, RateLimiter, SharedRateLimiter};
use crate::realtime::{create_registry, RefresherHandle, SharedRegistry};
use crate::store::SharedStore;

/// 애플리케이션 공유 상태.
pub struct AppState {
    /// 애플리케이션 설정
    pub settings: Settings,

    /// 시세 소스 collaborator
    pub quotes: SharedQuoteProvider,

    /// 포트폴리오/관심종목 저장소 collaborator
    pub store: SharedStore,

    /// 토큰 검증 collaborator
    pub identity: SharedIdentityProvider,

    /// REST 응답 캐시 (TTL 300초)
    pub cache: TtlCache,

    /// 실시간 구독 레지스트리
    pub registry: SharedRegistry,

    /// 공유 rate limiter
    pub limiter: SharedRateLimiter,

    /// 가격 리프레시 루프 핸들
    pub refresher: RefresherHandle,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// 레지스트리/캐시/limiter는 여기서 만들어지고, 외부 collaborator는
    /// 주입받습니다. 리프레시 루프 태스크는 아직 시작되지 않습니다
    /// (첫 구독이 시작시킵니다).
    pub fn new(
        settings: Settings,
        quotes: SharedQuoteProvider,
        store: SharedStore,
        identity: SharedIdentityProvider,
    ) -> Self {
        let registry: SharedRegistry = create_registry(
            settings.realtime.channel_capacity,
            settings.realtime.max_symbols_per_subscribe,
        );
        let limiter: SharedRateLimiter = Arc::new(RateLimiter::new());
        let cache = TtlCache::new(settings.cache.ttl());

        let refresher = RefresherHandle::new(
            Arc::clone(&registry),
            Arc::clone(&quotes),
            settings.realtime.clone(),
            CancellationToken::new(),
        );

        Self {
            settings,
            quotes,
            store,
            identity,
            cache,
            registry,
            limiter,
            refresher,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 특정 클래스용 rate limit 미들웨어 상태 생성.
    pub fn rate_limit_state(&self, class: LimitClass) -> RateLimitState {
        RateLimitState {
            class,
            limiter: Arc::clone(&self.limiter),
            identity: Arc::clone(&self.identity),
            disabled: self.settings.rate_limit.disabled,
        }
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 백그라운드 태스크에 정지 신호 전파.
    pub fn shutdown(&self) {
        self.refresher.stop();
    }

    // =========================================================================
    // 캐시 유틸리티 메서드
    // =========================================================================

    /// 캐시에서 타입 값을 조회합니다.
    ///
    /// 엔트리가 없거나 만료되었거나 역직렬화에 실패하면 None.
    pub async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key).await?;
        serde_json::from_value(value).ok()
    }

    /// 캐시에 타입 값을 저장합니다.
    ///
    /// 직렬화 실패는 무시합니다 (캐시는 best-effort).
    pub async fn cache_set<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(json) = serde_json::to_value(value) {
            self.cache.set(key, json).await;
        }
    }
}
