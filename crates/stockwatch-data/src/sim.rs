//! 모의 시세 소스.
//!
//! 네트워크 없이 개발/데모용으로 사용하는 랜덤 워크 기반 시세 생성기.
//! 알려진 심볼은 현실적인 기준가에서 출발하고, 그 외에는 심볼에서
//! 유도한 안정적인 기준가를 사용합니다.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use stockwatch_core::Symbol;

use crate::candle::{Candle, HistoryRange, Interval};
use crate::error::QuoteError;
use crate::provider::{CompanyProfile, QuoteProvider};

/// 알려진 심볼의 기준가와 이름.
const KNOWN_SYMBOLS: &[(&str, &str, i64)] = &[
    ("AAPL", "Apple Inc.", 225),
    ("GOOGL", "Alphabet Inc.", 180),
    ("MSFT", "Microsoft Corporation", 420),
    ("AMZN", "Amazon.com, Inc.", 185),
    ("TSLA", "Tesla, Inc.", 250),
    ("NVDA", "NVIDIA Corporation", 135),
    ("META", "Meta Platforms, Inc.", 560),
    ("NFLX", "Netflix, Inc.", 680),
    ("AMD", "Advanced Micro Devices, Inc.", 160),
    ("ORCL", "Oracle Corporation", 140),
    ("^IXIC", "NASDAQ Composite", 17800),
    ("^DJI", "Dow Jones Industrial Average", 39500),
    ("^GSPC", "S&P 500", 5600),
];

/// 랜덤 워크 기반 모의 시세 소스.
#[derive(Debug, Default)]
pub struct SimulatedQuotes;

impl SimulatedQuotes {
    /// 새 모의 시세 소스 생성.
    pub fn new() -> Self {
        Self
    }

    fn base_price(symbol: &Symbol) -> Decimal {
        if let Some((_, _, base)) = KNOWN_SYMBOLS.iter().find(|(s, _, _)| *s == symbol.as_str()) {
            return Decimal::from(*base);
        }
        // 미지의 심볼: 문자 합에서 유도한 안정적인 기준가
        let sum: u32 = symbol.as_str().bytes().map(u32::from).sum();
        Decimal::from(20 + sum % 480)
    }

    fn point_count(range: HistoryRange, interval: Interval) -> usize {
        match interval {
            Interval::OneMinute => match range {
                HistoryRange::OneDay => 60,
                HistoryRange::TwoDays => 120,
                HistoryRange::FiveDays => 300,
                HistoryRange::OneYear => 360,
            },
            Interval::OneDay => match range {
                HistoryRange::OneDay | HistoryRange::TwoDays => 2,
                HistoryRange::FiveDays => 5,
                HistoryRange::OneYear => 260,
            },
        }
    }
}

#[async_trait]
impl QuoteProvider for SimulatedQuotes {
    async fn history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, QuoteError> {
        let count = Self::point_count(range, interval);
        let step = match interval {
            Interval::OneMinute => ChronoDuration::minutes(1),
            Interval::OneDay => ChronoDuration::days(1),
        };
        let start = Utc::now() - step * count as i32;

        let base = Self::base_price(symbol);
        let mut price = base;
        let mut rng = rand::thread_rng();
        let mut candles = Vec::with_capacity(count);

        for i in 0..count {
            // -0.5% ~ +0.5% 랜덤 변동
            let drift = rng.gen_range(-0.005..0.005);
            let delta = price * Decimal::try_from(drift).unwrap_or_default();
            let open = price;
            price += delta;

            let high = open.max(price) * Decimal::new(1005, 3);
            let low = open.min(price) * Decimal::new(995, 3);
            let volume = rng.gen_range(100_000..5_000_000);

            candles.push(Candle {
                timestamp: start + step * i as i32,
                open: open.round_dp(4),
                high: high.round_dp(4),
                low: low.round_dp(4),
                close: price.round_dp(4),
                volume,
            });
        }

        Ok(candles)
    }

    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError> {
        let known = KNOWN_SYMBOLS.iter().find(|(s, _, _)| *s == symbol.as_str());

        Ok(match known {
            Some((_, name, base)) => CompanyProfile {
                name: Some((*name).to_string()),
                market_cap: Some(base * 10_000_000_000),
                pe_ratio: Some(Decimal::new(285, 1)),
            },
            None => CompanyProfile::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_history_point_counts() {
        let sim = SimulatedQuotes::new();

        let minute = sim
            .history(&symbol("AAPL"), HistoryRange::OneDay, Interval::OneMinute)
            .await
            .unwrap();
        assert_eq!(minute.len(), 60);

        let year = sim
            .history(&symbol("AAPL"), HistoryRange::OneYear, Interval::OneDay)
            .await
            .unwrap();
        assert_eq!(year.len(), 260);
    }

    #[tokio::test]
    async fn test_history_is_chronological() {
        let sim = SimulatedQuotes::new();
        let candles = sim
            .history(&symbol("MSFT"), HistoryRange::FiveDays, Interval::OneDay)
            .await
            .unwrap();

        for pair in candles.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_unknown_symbol_has_stable_base() {
        let sim = SimulatedQuotes::new();
        let a = sim
            .history(&symbol("ZZZZ"), HistoryRange::OneDay, Interval::OneMinute)
            .await
            .unwrap();
        let b = sim
            .history(&symbol("ZZZZ"), HistoryRange::OneDay, Interval::OneMinute)
            .await
            .unwrap();

        // 랜덤 워크라도 출발점은 같은 기준가
        assert_eq!(a[0].open, b[0].open);
    }

    #[tokio::test]
    async fn test_profile_known_and_unknown() {
        let sim = SimulatedQuotes::new();

        let known = sim.profile(&symbol("AAPL")).await.unwrap();
        assert_eq!(known.name.as_deref(), Some("Apple Inc."));
        assert!(known.market_cap.is_some());

        let unknown = sim.profile(&symbol("ZZZZ")).await.unwrap();
        assert!(unknown.name.is_none());
    }
}
