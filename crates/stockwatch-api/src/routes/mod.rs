//! API 라우트.
//!
//! 모든 REST 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `GET /health` - 헬스 체크
//! - `GET /api/market-indices` - 주요 지수 시세
//! - `GET /api/trending-stocks` - 인기 종목 확장 정보
//! - `GET /api/stock/{symbol}` - 단일 종목 상세
//! - `GET /api/search?q=` - 종목 검색
//! - `GET /api/portfolio/{user_id}` - 포트폴리오 조회 (인증)
//! - `POST /api/portfolio/transaction` - 거래 실행 (인증)
//! - `GET|POST /api/watchlist/{user_id}` - 관심종목 조회/교체 (인증)
//!
//! 공개 라우트는 default 클래스로, 인증 라우트는 authenticated
//! 클래스로 rate limit이 적용됩니다.

pub mod health;
pub mod market;
pub mod portfolio;
pub mod search;
pub mod stocks;
pub mod watchlist;

pub use health::{health_check, HealthResponse};
pub use market::{get_market_indices, get_trending_stocks, IndexQuote};
pub use portfolio::{
    execute_transaction, get_portfolio, PortfolioHolding, TransactionRequest, TransactionResponse,
};
pub use search::search_stocks;
pub use stocks::{get_stock, StockDetail};
pub use watchlist::{get_watchlist, update_watchlist, SuccessResponse, WatchlistUpdateRequest};

use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::{rate_limit_middleware, LimitClass};
use crate::state::AppState;

/// 사용자 ID 파라미터 검증 (`^[a-zA-Z0-9_-]+$`).
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Invalid format for parameter: user_id".to_string(),
        ))
    }
}

/// 전체 API 라우터 생성.
///
/// 공개/인증 라우트 그룹에 각각 다른 rate limit 클래스를 적용한 뒤
/// 하나의 라우터로 합칩니다.
pub fn create_api_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/api/market-indices", get(get_market_indices))
        .route("/api/trending-stocks", get(get_trending_stocks))
        .route("/api/stock/{symbol}", get(get_stock))
        .route("/api/search", get(search_stocks))
        .layer(middleware::from_fn_with_state(
            state.rate_limit_state(LimitClass::Default),
            rate_limit_middleware,
        ));

    let authenticated = Router::new()
        .route("/api/portfolio/{user_id}", get(get_portfolio))
        .route("/api/portfolio/transaction", post(execute_transaction))
        .route(
            "/api/watchlist/{user_id}",
            get(get_watchlist).post(update_watchlist),
        )
        .layer(middleware::from_fn_with_state(
            state.rate_limit_state(LimitClass::Authenticated),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(public)
        .merge(authenticated)
}
