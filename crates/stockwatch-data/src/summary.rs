//! 가격 히스토리 파생 통계.
//!
//! 핸들러와 리프레시 루프가 공유하는 순수 계산 함수들.
//! 모든 금액/비율은 소수점 2자리로 반올림해 와이어 형식과 맞춥니다.

use rust_decimal::Decimal;

use crate::candle::Candle;

/// 차트 시리즈 길이 (최근 30 종가).
pub const CHART_POINTS: usize = 30;

/// 연간 거래일 수 근사치. 52주 변화율의 기준점 탐색에 사용.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// 변화율 계산. 기준값이 0이면 0을 반환합니다.
fn percent_change(change: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        (change / base * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// 리프레시 사이클용 변화량: 마지막 종가 대비 스냅샷의 첫 종가.
///
/// # Returns
///
/// `(현재가, 변화량, 변화율)`. 빈 히스토리면 None.
pub fn cycle_change(candles: &[Candle]) -> Option<(Decimal, Decimal, Decimal)> {
    let first = candles.first()?.close;
    let last = candles.last()?.close;
    let change = (last - first).round_dp(2);
    Some((last.round_dp(2), change, percent_change(change, first)))
}

/// 전일 대비 변화량: 마지막 종가 대비 직전 종가.
///
/// 포인트가 하나뿐이면 변화량 0으로 처리합니다.
pub fn latest_change(candles: &[Candle]) -> Option<(Decimal, Decimal, Decimal)> {
    let last = candles.last()?.close;
    let prev = if candles.len() >= 2 {
        candles[candles.len() - 2].close
    } else {
        last
    };
    let change = (last - prev).round_dp(2);
    Some((last.round_dp(2), change, percent_change(change, prev)))
}

/// 1년 히스토리에서 계산되는 확장 통계.
#[derive(Debug, Clone, PartialEq)]
pub struct StockStatistics {
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변화량
    pub change: Decimal,
    /// 전일 대비 변화율 (%)
    pub change_percent: Decimal,
    /// 최근 거래량
    pub volume: u64,
    /// 최근 30포인트 평균 거래량
    pub avg_volume: u64,
    /// 52주 최고가
    pub week_high_52: Decimal,
    /// 52주 최저가
    pub week_low_52: Decimal,
    /// 52주 변화율 (%)
    pub week_change_52: Decimal,
    /// 차트 시리즈 (최근 30 종가)
    pub chart: Vec<Decimal>,
}

impl StockStatistics {
    /// 시간순 히스토리에서 통계 계산.
    ///
    /// 52주 변화율은 252 거래일 전 종가를 기준으로 하며, 히스토리가
    /// 그보다 짧으면 첫 종가를 기준으로 합니다. 포인트가 2개 미만이면
    /// None을 반환합니다.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        if candles.len() < 2 {
            return None;
        }

        let (price, change, change_percent) = latest_change(candles)?;

        let week_high_52 = candles
            .iter()
            .map(|c| c.high)
            .max()
            .unwrap_or_default()
            .round_dp(2);
        let week_low_52 = candles
            .iter()
            .map(|c| c.low)
            .min()
            .unwrap_or_default()
            .round_dp(2);

        let anchor = if candles.len() >= TRADING_DAYS_PER_YEAR {
            candles[candles.len() - TRADING_DAYS_PER_YEAR].close
        } else {
            candles[0].close
        };
        let week_change_52 = percent_change(price - anchor, anchor);

        let tail_start = candles.len().saturating_sub(CHART_POINTS);
        let chart: Vec<Decimal> = candles[tail_start..]
            .iter()
            .map(|c| c.close.round_dp(2))
            .collect();

        let volume = candles.last()?.volume;
        let tail = &candles[tail_start..];
        let avg_volume = tail.iter().map(|c| c.volume).sum::<u64>() / tail.len() as u64;

        Some(Self {
            price,
            change,
            change_percent,
            volume,
            avg_volume,
            week_high_52,
            week_low_52,
            week_change_52,
            chart,
        })
    }
}
