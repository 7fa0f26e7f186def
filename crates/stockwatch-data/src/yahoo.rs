//! Yahoo Finance 호환 차트 API 클라이언트.
//!
//! `v8/finance/chart`에서 가격 히스토리를, `v7/finance/quote`에서
//! 기업 프로필을 조회합니다. 기본 URL은 설정으로 교체 가능하므로
//! 테스트에서는 로컬 mock 서버를 사용할 수 있습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use stockwatch_core::{QuoteSourceConfig, Symbol};

use crate::candle::{Candle, HistoryRange, Interval};
use crate::error::QuoteError;
use crate::provider::{CompanyProfile, QuoteProvider};

/// Yahoo Finance 호환 차트 API 클라이언트.
pub struct YahooChartClient {
    client: Client,
    base_url: String,
}

impl YahooChartClient {
    /// 설정에서 클라이언트 생성.
    pub fn new(config: &QuoteSourceConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("stockwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 기본 URL을 직접 지정하여 생성 (테스트용).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 차트 응답을 캔들 목록으로 변환.
    ///
    /// 소스가 결측 포인트를 null로 내려주므로, 종가가 없는 인덱스는
    /// 통째로 건너뜁니다.
    fn candles_from_chart(symbol: &Symbol, data: ChartData) -> Result<Vec<Candle>, QuoteError> {
        let timestamps = data.timestamp.unwrap_or_default();
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::Parse("missing quote indicators".to_string()))?;

        let mut candles = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let close = match quote.close.get(i).copied().flatten() {
                Some(v) => v,
                None => continue,
            };
            let open = quote.open.get(i).copied().flatten().unwrap_or(close);
            let high = quote.high.get(i).copied().flatten().unwrap_or(close);
            let low = quote.low.get(i).copied().flatten().unwrap_or(close);
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            let timestamp = DateTime::<Utc>::from_timestamp(*ts, 0)
                .ok_or_else(|| QuoteError::Parse(format!("invalid timestamp: {}", ts)))?;

            candles.push(Candle {
                timestamp,
                open: decimal_from_f64(open)?,
                high: decimal_from_f64(high)?,
                low: decimal_from_f64(low)?,
                close: decimal_from_f64(close)?,
                volume,
            });
        }

        if candles.is_empty() {
            return Err(QuoteError::NoData(symbol.to_string()));
        }

        Ok(candles)
    }
}

fn decimal_from_f64(value: f64) -> Result<Decimal, QuoteError> {
    Decimal::try_from(value).map_err(|e| QuoteError::Parse(format!("bad price {}: {}", value, e)))
}

#[async_trait]
impl QuoteProvider for YahooChartClient {
    async fn history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
        interval: Interval,
    ) -> Result<Vec<Candle>, QuoteError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        debug!(symbol = %symbol, range = range.as_query(), interval = interval.as_query(), "Fetching chart");

        let response = self
            .client
            .get(&url)
            .query(&[("range", range.as_query()), ("interval", interval.as_query())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::NoData(symbol.to_string()));
        }
        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status().as_u16()));
        }

        let body: ChartResponse = response.json().await?;

        if let Some(err) = body.chart.error {
            return Err(QuoteError::NoData(format!("{}: {}", symbol, err.description)));
        }

        let data = body
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))?;

        Self::candles_from_chart(symbol, data)
    }

    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, QuoteError> {
        let url = format!("{}/v7/finance/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbol.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status().as_u16()));
        }

        let body: QuoteLookupResponse = response.json().await?;

        let item = body
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::NoData(symbol.to_string()))?;

        let pe_ratio = match item.trailing_pe {
            Some(v) => Some(decimal_from_f64(v)?),
            None => None,
        };

        Ok(CompanyProfile {
            name: item.long_name.or(item.short_name),
            market_cap: item.market_cap,
            pe_ratio,
        })
    }
}

// ==================== 응답 스키마 ====================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ChartErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChartErrorBody {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteLookupResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteLookupEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteLookupEnvelope {
    #[serde(default)]
    result: Vec<QuoteLookupItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteLookupItem {
    long_name: Option<String>,
    short_name: Option<String>,
    market_cap: Option<i64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
}
