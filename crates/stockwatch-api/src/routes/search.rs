//! 종목 검색 endpoint.
//!
//! `GET /api/search?q=` - 큐레이션된 심볼 유니버스에 대한 랭킹 검색.
//! 정확 일치 → 접두 일치 → 부분 일치(회사명 포함) 순으로 정렬됩니다.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stockwatch_core::Symbol;
use stockwatch_data::{latest_change, HistoryRange, Interval, QuoteError};

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::routes::stocks::StockDetail;
use crate::state::AppState;

/// 결과 상한.
const MAX_SEARCH_RESULTS: usize = 15;

/// 검색 대상 심볼 유니버스 (심볼, 회사명).
///
/// 외부 검색 API 없이 커버하는 주요 종목/ETF 목록.
const SEARCH_UNIVERSE: &[(&str, &str)] = &[
    // 기술 대형주
    ("AAPL", "Apple Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("GOOG", "Alphabet Inc. Class C"),
    ("MSFT", "Microsoft Corporation"),
    ("AMZN", "Amazon.com, Inc."),
    ("TSLA", "Tesla, Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("META", "Meta Platforms, Inc."),
    ("NFLX", "Netflix, Inc."),
    ("ORCL", "Oracle Corporation"),
    ("CRM", "Salesforce, Inc."),
    ("ADBE", "Adobe Inc."),
    ("INTC", "Intel Corporation"),
    ("CSCO", "Cisco Systems, Inc."),
    ("AMD", "Advanced Micro Devices, Inc."),
    ("UBER", "Uber Technologies, Inc."),
    ("SPOT", "Spotify Technology S.A."),
    ("SHOP", "Shopify Inc."),
    ("SNOW", "Snowflake Inc."),
    ("PLTR", "Palantir Technologies Inc."),
    ("NET", "Cloudflare, Inc."),
    // 전통 우량주
    ("JNJ", "Johnson & Johnson"),
    ("PG", "Procter & Gamble Company"),
    ("KO", "Coca-Cola Company"),
    ("PEP", "PepsiCo, Inc."),
    ("WMT", "Walmart Inc."),
    ("HD", "Home Depot, Inc."),
    ("MCD", "McDonald's Corporation"),
    ("DIS", "Walt Disney Company"),
    ("NKE", "NIKE, Inc."),
    ("V", "Visa Inc."),
    ("MA", "Mastercard Incorporated"),
    // 금융
    ("JPM", "JPMorgan Chase & Co."),
    ("BAC", "Bank of America Corporation"),
    ("WFC", "Wells Fargo & Company"),
    ("GS", "Goldman Sachs Group, Inc."),
    ("MS", "Morgan Stanley"),
    ("AXP", "American Express Company"),
    ("SCHW", "Charles Schwab Corporation"),
    ("BLK", "BlackRock, Inc."),
    // 헬스케어
    ("PFE", "Pfizer Inc."),
    ("MRK", "Merck & Co., Inc."),
    ("ABBV", "AbbVie Inc."),
    ("LLY", "Eli Lilly and Company"),
    ("UNH", "UnitedHealth Group Incorporated"),
    ("AMGN", "Amgen Inc."),
    ("GILD", "Gilead Sciences, Inc."),
    ("MRNA", "Moderna, Inc."),
    // 에너지/산업
    ("XOM", "Exxon Mobil Corporation"),
    ("CVX", "Chevron Corporation"),
    ("CAT", "Caterpillar Inc."),
    ("BA", "Boeing Company"),
    ("GE", "GE Aerospace"),
    ("UPS", "United Parcel Service, Inc."),
    ("LMT", "Lockheed Martin Corporation"),
    ("DE", "Deere & Company"),
    // ETF
    ("SPY", "SPDR S&P 500 ETF Trust"),
    ("QQQ", "Invesco QQQ Trust"),
    ("IWM", "iShares Russell 2000 ETF"),
    ("VTI", "Vanguard Total Stock Market ETF"),
    ("GLD", "SPDR Gold Shares"),
    ("TLT", "iShares 20+ Year Treasury Bond ETF"),
    // 해외 ADR
    ("BABA", "Alibaba Group Holding Limited"),
    ("TSM", "Taiwan Semiconductor Manufacturing Company"),
    ("ASML", "ASML Holding N.V."),
    ("SAP", "SAP SE"),
    ("TM", "Toyota Motor Corporation"),
    ("NVO", "Novo Nordisk A/S"),
];

/// 검색 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// 검색어
    pub q: Option<String>,
}

/// 쿼리 문자 검증: 영숫자, 공백, `.`, `-` 만 허용.
fn is_valid_query(query: &str) -> bool {
    query
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '.' || c == '-')
}

/// 유니버스에서 후보를 랭킹해 반환.
///
/// 점수: 0 = 심볼 정확 일치, 1 = 심볼 접두 일치, 2 = 심볼/회사명
/// 부분 일치. 점수 → 심볼 순으로 정렬합니다.
pub(crate) fn rank_candidates<'a>(
    query: &str,
    universe: &[(&'a str, &'a str)],
) -> Vec<(&'a str, &'a str)> {
    let mut scored: Vec<(u8, &str, &str)> = universe
        .iter()
        .filter_map(|(symbol, name)| {
            let score = if *symbol == query {
                0
            } else if symbol.starts_with(query) {
                1
            } else if symbol.contains(query) || name.to_uppercase().contains(query) {
                2
            } else {
                return None;
            };
            Some((score, *symbol, *name))
        })
        .collect();

    scored.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    scored
        .into_iter()
        .map(|(_, symbol, name)| (symbol, name))
        .collect()
}

/// 5일 히스토리로 가벼운 검색 결과 항목 구성.
///
/// 검색 결과에서는 52주 변화율과 차트를 생략합니다 (성능).
async fn quick_quote(
    state: &AppState,
    symbol: &Symbol,
    fallback_name: &str,
) -> Result<StockDetail, QuoteError> {
    let candles = state
        .quotes
        .history(symbol, HistoryRange::FiveDays, Interval::OneDay)
        .await?;

    let (price, change, change_percent) =
        latest_change(&candles).ok_or_else(|| QuoteError::NoData(symbol.to_string()))?;

    let week_high = candles
        .iter()
        .map(|c| c.high)
        .max()
        .unwrap_or_default()
        .round_dp(2);
    let week_low = candles
        .iter()
        .map(|c| c.low)
        .min()
        .unwrap_or_default()
        .round_dp(2);
    let volume = candles.last().map(|c| c.volume).unwrap_or(0);
    let avg_volume = volume_mean(&candles);

    let profile = state.quotes.profile(symbol).await.unwrap_or_default();

    Ok(StockDetail {
        symbol: symbol.clone(),
        name: profile.name.unwrap_or_else(|| fallback_name.to_string()),
        price,
        change,
        change_percent,
        volume,
        avg_volume,
        market_cap: profile.market_cap,
        pe_ratio: profile.pe_ratio,
        week_high_52: week_high,
        week_low_52: week_low,
        week_change_52: rust_decimal::Decimal::ZERO,
        chart: Vec::new(),
    })
}

fn volume_mean(candles: &[stockwatch_data::Candle]) -> u64 {
    if candles.is_empty() {
        return 0;
    }
    candles.iter().map(|c| c.volume).sum::<u64>() / candles.len() as u64
}

/// GET /api/search?q= - 종목 검색.
#[utoipa::path(
    get,
    path = "/api/search",
    params(("q" = String, Query, description = "검색어 (심볼 또는 회사명)")),
    responses(
        (status = 200, description = "랭킹된 검색 결과", body = [StockDetail]),
        (status = 400, description = "쿼리 형식 위반", body = ErrorBody),
    ),
    tag = "stocks"
)]
pub async fn search_stocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<StockDetail>>> {
    let raw = query.q.unwrap_or_default();
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Ok(Json(Vec::new()));
    }
    if !is_valid_query(trimmed) {
        return Err(ApiError::Validation(
            "Invalid format for parameter: q".to_string(),
        ));
    }

    let normalized = trimmed.to_uppercase();

    // 심볼처럼 생긴 짧은 쿼리는 직접 조회를 먼저 시도
    if normalized.len() <= 5 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        if let Ok(symbol) = Symbol::parse(&normalized) {
            match quick_quote(&state, &symbol, symbol.as_str()).await {
                Ok(detail) => {
                    info!(query = %normalized, "Direct symbol lookup succeeded");
                    return Ok(Json(vec![detail]));
                }
                Err(e) => {
                    debug!(query = %normalized, error = %e, "Direct symbol lookup failed");
                }
            }
        }
    }

    let mut results = Vec::new();
    for (raw_symbol, name) in rank_candidates(&normalized, SEARCH_UNIVERSE) {
        if results.len() >= MAX_SEARCH_RESULTS {
            break;
        }
        let Ok(symbol) = Symbol::parse(raw_symbol) else {
            continue;
        };
        match quick_quote(&state, &symbol, name).await {
            Ok(detail) => results.push(detail),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Search candidate fetch failed");
                continue;
            }
        }
    }

    info!(query = %normalized, count = results.len(), "Search completed");
    Ok(Json(results))
}
