//! 단일 종목 조회 endpoint.
//!
//! `GET /api/stock/{symbol}` - 1년 히스토리 기반 확장 종목 정보.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

use stockwatch_core::Symbol;
use stockwatch_data::{HistoryRange, Interval, QuoteError, StockStatistics};

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::state::AppState;

/// 확장 종목 정보.
///
/// 종목 상세/트렌딩/검색 응답에서 공유하는 와이어 형식.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockDetail {
    /// 심볼
    #[schema(value_type = String)]
    pub symbol: Symbol,
    /// 회사/지수 이름
    pub name: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변화량
    pub change: Decimal,
    /// 전일 대비 변화율 (%)
    pub change_percent: Decimal,
    /// 최근 거래량
    pub volume: u64,
    /// 평균 거래량
    pub avg_volume: u64,
    /// 시가총액 (소스가 제공하지 않으면 null)
    pub market_cap: Option<i64>,
    /// PER (소스가 제공하지 않으면 null)
    pub pe_ratio: Option<Decimal>,
    /// 52주 최고가
    pub week_high_52: Decimal,
    /// 52주 최저가
    pub week_low_52: Decimal,
    /// 52주 변화율 (%)
    pub week_change_52: Decimal,
    /// 차트 시리즈 (최근 30 종가)
    pub chart: Vec<Decimal>,
}

/// 1년 히스토리와 프로필로 확장 종목 정보 구성.
///
/// 프로필 조회 실패는 치명적이지 않으므로 이름/시총 없이 진행합니다.
pub(crate) async fn fetch_stock_detail(
    state: &AppState,
    symbol: &Symbol,
) -> Result<StockDetail, QuoteError> {
    let candles = state
        .quotes
        .history(symbol, HistoryRange::OneYear, Interval::OneDay)
        .await?;

    let stats = StockStatistics::from_candles(&candles)
        .ok_or_else(|| QuoteError::NoData(symbol.to_string()))?;

    let profile = match state.quotes.profile(symbol).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "Profile fetch failed, continuing without it");
            Default::default()
        }
    };

    Ok(StockDetail {
        symbol: symbol.clone(),
        name: profile.name.unwrap_or_else(|| symbol.to_string()),
        price: stats.price,
        change: stats.change,
        change_percent: stats.change_percent,
        volume: stats.volume,
        avg_volume: stats.avg_volume,
        market_cap: profile.market_cap,
        pe_ratio: profile.pe_ratio,
        week_high_52: stats.week_high_52,
        week_low_52: stats.week_low_52,
        week_change_52: stats.week_change_52,
        chart: stats.chart,
    })
}

/// GET /api/stock/{symbol} - 종목 상세 조회.
#[utoipa::path(
    get,
    path = "/api/stock/{symbol}",
    params(("symbol" = String, Path, description = "종목 심볼 (^[A-Z^]{1,10}$)")),
    responses(
        (status = 200, description = "종목 상세", body = StockDetail),
        (status = 400, description = "심볼 문법 위반", body = ErrorBody),
        (status = 404, description = "데이터 없음", body = ErrorBody),
        (status = 429, description = "Rate limit 초과", body = ErrorBody),
    ),
    tag = "stocks"
)]
pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(raw_symbol): Path<String>,
) -> ApiResult<Json<StockDetail>> {
    let symbol = Symbol::parse(&raw_symbol)
        .map_err(|_| ApiError::Validation("Invalid format for parameter: symbol".to_string()))?;

    let cache_key = format!("stock_{}", symbol);
    if let Some(cached) = state.cache_get::<StockDetail>(&cache_key).await {
        debug!(symbol = %symbol, "Returning cached stock data");
        return Ok(Json(cached));
    }

    let detail = fetch_stock_detail(&state, &symbol).await.map_err(|e| match e {
        QuoteError::NoData(_) => {
            ApiError::NotFound(format!("No data available for {}", symbol))
        }
        other => {
            warn!(symbol = %symbol, error = %other, "Stock fetch failed");
            ApiError::Upstream(format!("Failed to fetch data for {}", symbol))
        }
    })?;

    state.cache_set(&cache_key, &detail).await;
    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_test_state_with, StaticIdentity, StaticQuotes};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use rust_decimal_macros::dec;
    use stockwatch_data::CompanyProfile;
    use tower::ServiceExt;

    fn test_app(quotes: StaticQuotes) -> Router {
        let state = Arc::new(create_test_state_with(quotes, StaticIdentity::new()));
        Router::new()
            .route("/api/stock/{symbol}", get(get_stock))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_symbol_is_400() {
        let app = test_app(StaticQuotes::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stock/aapl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("symbol"));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_404() {
        let app = test_app(StaticQuotes::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stock/ZZZZ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stock_detail_shape() {
        let quotes = StaticQuotes::new()
            .with_closes("AAPL", &[dec!(100), dec!(102), dec!(105)])
            .with_profile(
                "AAPL",
                CompanyProfile {
                    name: Some("Apple Inc.".to_string()),
                    market_cap: Some(3_000_000_000_000),
                    pe_ratio: Some(dec!(33.5)),
                },
            );
        let app = test_app(quotes);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stock/AAPL")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["name"], "Apple Inc.");
        assert_eq!(body["price"], 105.0);
        assert_eq!(body["change"], 3.0);
        // camelCase 와이어 형식
        assert!(body.get("changePercent").is_some());
        assert!(body.get("weekHigh52").is_some());
        assert!(body.get("marketCap").is_some());
        assert!(body["chart"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let quotes = StaticQuotes::new().with_closes("AAPL", &[dec!(100), dec!(105)]);
        let state = Arc::new(create_test_state_with(quotes, StaticIdentity::new()));
        let app = Router::new()
            .route("/api/stock/{symbol}", get(get_stock))
            .with_state(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/stock/AAPL")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // 첫 요청 후 캐시에 저장됨
        assert!(state
            .cache_get::<StockDetail>("stock_AAPL")
            .await
            .is_some());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stock/AAPL")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
