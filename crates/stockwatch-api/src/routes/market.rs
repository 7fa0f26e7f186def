//! 시장 개요 endpoint.
//!
//! - `GET /api/market-indices` - 주요 지수 시세
//! - `GET /api/trending-stocks` - 인기 종목 확장 정보

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use stockwatch_core::Symbol;
use stockwatch_data::{latest_change, HistoryRange, Interval};

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::routes::stocks::{fetch_stock_detail, StockDetail};
use crate::state::AppState;

/// 추적하는 주요 지수와 표시 이름.
const INDEX_SYMBOLS: &[(&str, &str)] = &[
    ("^IXIC", "NASDAQ Composite"),
    ("^DJI", "Dow Jones Industrial Average"),
    ("^GSPC", "S&P 500"),
];

/// 트렌딩 목록에 사용하는 인기 종목.
const TRENDING_SYMBOLS: &[&str] = &[
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "META", "NFLX", "AMD", "ORCL",
];

/// 지수 시세.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuote {
    /// 지수 심볼
    #[schema(value_type = String)]
    pub symbol: Symbol,
    /// 지수 이름
    pub name: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변화량
    pub change: Decimal,
    /// 전일 대비 변화율 (%)
    pub change_percent: Decimal,
}

/// GET /api/market-indices - 주요 지수 시세.
///
/// 개별 지수 조회 실패는 건너뛰고, 하나도 가져오지 못한 경우에만
/// 500을 반환합니다.
#[utoipa::path(
    get,
    path = "/api/market-indices",
    responses(
        (status = 200, description = "지수 시세 목록", body = [IndexQuote]),
        (status = 500, description = "지수를 하나도 가져오지 못함", body = ErrorBody),
    ),
    tag = "market"
)]
pub async fn get_market_indices(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<IndexQuote>>> {
    let cache_key = "market_indices";
    if let Some(cached) = state.cache_get::<Vec<IndexQuote>>(cache_key).await {
        debug!("Returning cached market indices");
        return Ok(Json(cached));
    }

    let mut indices = Vec::with_capacity(INDEX_SYMBOLS.len());

    for (raw_symbol, name) in INDEX_SYMBOLS {
        let symbol = match Symbol::parse(raw_symbol) {
            Ok(symbol) => symbol,
            Err(_) => continue,
        };

        let candles = match state
            .quotes
            .history(&symbol, HistoryRange::TwoDays, Interval::OneDay)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Index fetch failed");
                continue;
            }
        };

        if candles.len() < 2 {
            warn!(symbol = %symbol, "Insufficient data for index");
            continue;
        }

        let Some((price, change, change_percent)) = latest_change(&candles) else {
            continue;
        };

        indices.push(IndexQuote {
            symbol,
            name: (*name).to_string(),
            price,
            change,
            change_percent,
        });
    }

    if indices.is_empty() {
        warn!("No market indices data could be fetched");
        return Err(ApiError::Upstream("No data available".to_string()));
    }

    info!(count = indices.len(), "Fetched market indices");
    state.cache_set(cache_key, &indices).await;
    Ok(Json(indices))
}

/// GET /api/trending-stocks - 인기 종목 확장 정보.
///
/// 부분 실패 허용: 실패한 종목은 빠지고 나머지가 반환됩니다.
#[utoipa::path(
    get,
    path = "/api/trending-stocks",
    responses(
        (status = 200, description = "인기 종목 목록", body = [StockDetail]),
        (status = 500, description = "종목을 하나도 가져오지 못함", body = ErrorBody),
    ),
    tag = "market"
)]
pub async fn get_trending_stocks(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<StockDetail>>> {
    let cache_key = "trending_stocks";
    if let Some(cached) = state.cache_get::<Vec<StockDetail>>(cache_key).await {
        debug!("Returning cached trending stocks");
        return Ok(Json(cached));
    }

    let mut stocks = Vec::with_capacity(TRENDING_SYMBOLS.len());

    for raw_symbol in TRENDING_SYMBOLS {
        let symbol = match Symbol::parse(raw_symbol) {
            Ok(symbol) => symbol,
            Err(_) => continue,
        };

        match fetch_stock_detail(&state, &symbol).await {
            Ok(detail) => stocks.push(detail),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Trending stock fetch failed");
                continue;
            }
        }
    }

    if stocks.is_empty() {
        warn!("No trending stocks data could be fetched");
        return Err(ApiError::Upstream("No data available".to_string()));
    }

    info!(count = stocks.len(), "Fetched trending stocks");
    state.cache_set(cache_key, &stocks).await;
    Ok(Json(stocks))
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
    use tower::ServiceExt;

    fn test_app(quotes: StaticQuotes) -> Router {
        let state = Arc::new(create_test_state_with(quotes, StaticIdentity::new()));
        Router::new()
            .route("/api/market-indices", get(get_market_indices))
            .route("/api/trending-stocks", get(get_trending_stocks))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_indices_partial_failure_returns_rest() {
        // ^GSPC만 데이터 제공, 나머지 두 지수는 실패
        let quotes = StaticQuotes::new().with_closes("^GSPC", &[dec!(5600), dec!(5656)]);
        let app = test_app(quotes);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/market-indices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let indices = body.as_array().unwrap();

        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0]["symbol"], "^GSPC");
        assert_eq!(indices[0]["name"], "S&P 500");
        assert_eq!(indices[0]["change"], 56.0);
        assert_eq!(indices[0]["changePercent"], 1.0);
    }

    #[tokio::test]
    async fn test_indices_all_failed_is_500() {
        let app = test_app(StaticQuotes::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/market-indices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No data available");
    }

    #[tokio::test]
    async fn test_trending_partial_failure_returns_rest() {
        // 10개 중 2개만 성공
        let quotes = StaticQuotes::new()
            .with_closes("AAPL", &[dec!(100), dec!(105)])
            .with_closes("MSFT", &[dec!(400), dec!(410)])
            .with_failing("TSLA");
        let app = test_app(quotes);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/trending-stocks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let stocks = body.as_array().unwrap();

        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[0]["symbol"], "AAPL");
        assert_eq!(stocks[1]["symbol"], "MSFT");
    }

    #[tokio::test]
    async fn test_trending_all_failed_is_500() {
        let app = test_app(StaticQuotes::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/trending-stocks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
