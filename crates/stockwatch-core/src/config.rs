//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 기본값 → 설정 파일(선택) → `STOCKWATCH__*` 환경 변수 순서로 오버라이드됩니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// 서버 설정
    pub server: ServerConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 시세 소스 설정
    pub quotes: QuoteSourceConfig,
    /// 응답 캐시 설정
    pub cache: CacheConfig,
    /// 실시간 엔진 설정
    pub realtime: RealtimeConfig,
    /// Rate limit 설정
    pub rate_limit: RateLimitSettings,
    /// 로깅 설정
    pub logging: LoggingSettings,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin 목록 (비어 있으면 모든 origin 허용, 개발 모드)
    pub cors_origins: Vec<String>,
    /// 요청 전역 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// 인증 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT 서명 검증용 시크릿
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-key-change-in-production".to_string(),
        }
    }
}

/// 시세 소스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSourceKind {
    /// 외부 차트 API (Yahoo Finance 호환)
    Yahoo,
    /// 내장 시뮬레이터 (네트워크 없이 개발/테스트)
    Simulated,
}

/// 시세 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteSourceConfig {
    /// 사용할 시세 소스
    pub source: QuoteSourceKind,
    /// 차트 API 기본 URL
    pub base_url: String,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for QuoteSourceConfig {
    fn default() -> Self {
        Self {
            source: QuoteSourceKind::Simulated,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
        }
    }
}

/// 응답 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 캐시 엔트리 TTL (초)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    /// TTL을 Duration으로 반환.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 실시간 엔진 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// 가격 리프레시 주기 (초)
    pub refresh_interval_secs: u64,
    /// 사이클 실패 시 백오프 (초)
    pub error_backoff_secs: u64,
    /// 심볼당 시세 조회 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 구독 요청당 최대 심볼 수
    pub max_symbols_per_subscribe: usize,
    /// 브로드캐스트 채널 버퍼 크기
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            error_backoff_secs: 60,
            fetch_timeout_secs: 8,
            max_symbols_per_subscribe: 20,
            channel_capacity: 1024,
        }
    }
}

impl RealtimeConfig {
    /// 리프레시 주기를 Duration으로 반환.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// 백오프 주기를 Duration으로 반환.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// 조회 타임아웃을 Duration으로 반환.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Rate limit 설정.
///
/// 클래스별 허용량은 고정 정책이므로 미들웨어 쪽에 정의되어 있고,
/// 여기서는 전체 비활성화 여부만 다룹니다.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Rate limit 전체 비활성화 (부하 테스트용)
    pub disabled: bool,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 로그 레벨 필터 (예: "info", "stockwatch_api=debug")
    pub level: String,
    /// 출력 형식 ("pretty" | "json" | "compact")
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일은 없어도 됩니다. 환경 변수는 `STOCKWATCH__` 접두어와
    /// `__` 구분자를 사용합니다 (예: `STOCKWATCH__SERVER__PORT=8080`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("STOCKWATCH")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let mut settings: Settings = config.try_deserialize()?;

        // 기존 배포 스크립트와의 호환을 위한 단축 환경 변수
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                settings.server.port = port;
            }
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            settings.auth.jwt_secret = secret;
        }

        Ok(settings)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.cache.ttl_secs, 300);
        assert_eq!(settings.realtime.refresh_interval_secs, 30);
        assert_eq!(settings.realtime.error_backoff_secs, 60);
        assert_eq!(settings.realtime.max_symbols_per_subscribe, 20);
        assert_eq!(settings.quotes.source, QuoteSourceKind::Simulated);
        assert!(!settings.rate_limit.disabled);
    }

    #[test]
    fn test_durations() {
        let realtime = RealtimeConfig::default();
        assert_eq!(realtime.refresh_interval(), Duration::from_secs(30));
        assert_eq!(realtime.error_backoff(), Duration::from_secs(60));

        let cache = CacheConfig::default();
        assert_eq!(cache.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_quote_source_kind_from_str() {
        let kind: QuoteSourceKind = serde_json::from_str(r#""yahoo""#).unwrap();
        assert_eq!(kind, QuoteSourceKind::Yahoo);
        let kind: QuoteSourceKind = serde_json::from_str(r#""simulated""#).unwrap();
        assert_eq!(kind, QuoteSourceKind::Simulated);
    }
}
