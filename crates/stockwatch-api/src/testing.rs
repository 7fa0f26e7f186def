//! 테스트 유틸리티.
//!
//! 실제 네트워크/토큰 없이 동작하는 stub collaborator와
//! 테스트용 AppState 생성 헬퍼.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use stockwatch_core::{Settings, Symbol};
use stockwatch_data::{Candle, CompanyProfile, HistoryRange, Interval, QuoteError, QuoteProvider};

use crate::auth::{AuthError, AuthUser, IdentityProvider};
use crate::state::AppState;
use crate::store::MemoryStore;

/// 종가 목록에서 1분 간격 캔들 생성.
pub fn candles_from_closes(closes: &[Decimal]) -> Vec<Candle> {
    let start = Utc::now() - ChronoDuration::minutes(closes.len() as i64);
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle {
            timestamp: start + ChronoDuration::minutes(i as i64),
            open: *close,
            high: *close + Decimal::ONE,
            low: *close - Decimal::ONE,
            close: *close,
            volume: 1_000 + i as u64,
        })
        .collect()
}

/// 고정 응답 시세 소스.
///
/// 심볼별 히스토리/프로필을 미리 넣어두고, 지정된 심볼은 항상
/// 실패시킬 수 있습니다. 범위/해상도는 무시하고 같은 히스토리를
/// 돌려줍니다.
#[derive(Default)]
pub struct StaticQuotes {
    histories: HashMap<String, Vec<Candle>>,
    profiles: HashMap<String, CompanyProfile>,
    failing: HashSet<String>,
}

impl StaticQuotes {
    /// 빈 stub 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 종가 목록으로 심볼 히스토리 등록.
    pub fn with_closes(mut self, symbol: &str, closes: &[Decimal]) -> Self {
        self.histories
            .insert(symbol.to_string(), candles_from_closes(closes));
        self
    }

    /// 캔들 목록으로 심볼 히스토리 등록.
    pub fn with_history(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.histories.insert(symbol.to_string(), candles);
        self
    }

    /// 항상 실패하는 심볼 등록.
    pub fn with_failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// 프로필 등록.
    pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.profiles.insert(symbol.to_string(), profile);
        self
    }
}

#[async_trait]
impl QuoteProvider for StaticQuotes {
    async fn history(
        &self,
        symbol: &Symbol,
        _range: HistoryRange,
        _interval: Interval,
    ) -> Result<Vec<Candle>, QuoteError> {
        if self.failing.contains(symbol.as_str()) {
            return Err(QuoteError::Status(503));
        }
        self.histories
            .get(symbol.as_str())
            .cloned()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))
    }

    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError> {
        if self.failing.contains(symbol.as_str()) {
            return Err(QuoteError::Status(503));
        }
        Ok(self
            .profiles
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

/// 고정 토큰 맵 identity provider.
///
/// 토큰 문자열 → 사용자 ID 매핑. 맵에 없는 토큰은 거부합니다.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, String>,
}

impl StaticIdentity {
    /// 빈 provider 생성 (모든 토큰 거부).
    pub fn new() -> Self {
        Self::default()
    }

    /// 토큰 → 사용자 매핑 추가.
    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .get(token)
            .map(|user_id| AuthUser {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

/// 기본 stub들로 테스트용 AppState 생성.
pub fn create_test_state() -> AppState {
    create_test_state_with(StaticQuotes::new(), StaticIdentity::new())
}

/// 지정한 stub들로 테스트용 AppState 생성.
pub fn create_test_state_with(quotes: StaticQuotes, identity: StaticIdentity) -> AppState {
    AppState::new(
        Settings::default(),
        Arc::new(quotes),
        Arc::new(MemoryStore::new()),
        Arc::new(identity),
    )
}
