//! 시세 소스 추상화.
//!
//! 외부 시세 공급자를 주입 가능한 collaborator로 다루기 위한 trait.
//! 실제 구현은 [`crate::yahoo::YahooChartClient`]와
//! [`crate::sim::SimulatedQuotes`]가 제공합니다.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use stockwatch_core::Symbol;

use crate::candle::{Candle, HistoryRange, Interval};
use crate::error::QuoteError;

/// 기업 프로필 정보.
///
/// 차트 데이터로는 얻을 수 없는 메타데이터. 소스가 제공하지 않는
/// 필드는 None으로 남으며, 와이어에서는 null로 직렬화됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// 회사/지수 이름
    pub name: Option<String>,
    /// 시가총액
    pub market_cap: Option<i64>,
    /// PER (trailing)
    pub pe_ratio: Option<Decimal>,
}

/// 시세 소스.
///
/// 모든 조회는 심볼 단위로 독립적으로 실패할 수 있습니다. 호출자는
/// 한 심볼의 실패가 배치 전체를 중단시키지 않도록 처리해야 합니다.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 지정 범위/해상도의 가격 히스토리를 시간순으로 반환.
    async fn history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, QuoteError>;

    /// 기업 프로필 조회.
    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError>;
}

/// 공유 가능한 시세 소스 타입.
pub type SharedQuoteProvider = Arc<dyn QuoteProvider>;
