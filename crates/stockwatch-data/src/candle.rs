//! 캔들(OHLCV) 및 조회 범위 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 단일 OHLCV 포인트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 포인트 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: u64,
}

/// 히스토리 조회 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    /// 최근 1일
    OneDay,
    /// 최근 2일
    TwoDays,
    /// 최근 5일
    FiveDays,
    /// 최근 1년
    OneYear,
}

impl HistoryRange {
    /// 차트 API 쿼리 파라미터 값.
    pub fn as_query(&self) -> &'static str {
        match self {
            HistoryRange::OneDay => "1d",
            HistoryRange::TwoDays => "2d",
            HistoryRange::FiveDays => "5d",
            HistoryRange::OneYear => "1y",
        }
    }
}

/// 포인트 해상도.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// 1분봉
    OneMinute,
    /// 일봉
    OneDay,
}

impl Interval {
    /// 차트 API 쿼리 파라미터 값.
    pub fn as_query(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::OneDay => "1d",
        }
    }
}
