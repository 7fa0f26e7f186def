//! 포트폴리오 endpoint.
//!
//! - `GET /api/portfolio/{user_id}` - 실시간 시세로 보강된 보유 종목
//! - `POST /api/portfolio/transaction` - 매수/매도 거래 실행
//!
//! 두 endpoint 모두 인증 필수이며, 조회는 본인 포트폴리오만
//! 허용됩니다.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use stockwatch_core::{Holding, SellOutcome, Symbol, Transaction, TransactionKind};
use stockwatch_data::{latest_change, HistoryRange, Interval};

use crate::auth::RequireIdentity;
use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::routes::validate_user_id;
use crate::state::AppState;

/// 시세로 보강된 보유 종목.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioHolding {
    /// 심볼
    #[schema(value_type = String)]
    pub symbol: Symbol,
    /// 회사 이름
    pub name: String,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변화량
    pub change: Decimal,
    /// 전일 대비 변화율 (%)
    pub change_percent: Decimal,
    /// 보유 주식 수
    pub shares: u64,
    /// 평가 금액
    pub total_value: Decimal,
    /// 평균 매수 단가
    pub purchase_price: Decimal,
    /// 평가 손익
    pub gain_loss: Decimal,
    /// 평가 손익률 (%)
    pub gain_loss_percent: Decimal,
}

/// 거래 요청 바디.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransactionRequest {
    /// 심볼
    pub symbol: String,
    /// 거래 유형 ("buy" | "sell")
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: TransactionKind,
    /// 주식 수 (1 이상)
    #[validate(range(min = 1))]
    pub shares: u64,
    /// 주당 가격 (0 초과)
    #[validate(custom(function = "validate_positive_price"))]
    #[schema(value_type = f64)]
    pub price: Decimal,
}

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("price_not_positive"))
    }
}

/// 거래 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// 성공 여부
    pub success: bool,
    /// 결과 메시지
    pub message: String,
}

/// GET /api/portfolio/{user_id} - 보유 종목 조회.
///
/// 개별 종목 시세 실패는 해당 보유만 건너뜁니다.
#[utoipa::path(
    get,
    path = "/api/portfolio/{user_id}",
    params(("user_id" = String, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "보유 종목 목록", body = [PortfolioHolding]),
        (status = 401, description = "인증 필요", body = ErrorBody),
        (status = 403, description = "본인 포트폴리오 아님", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "portfolio"
)]
pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    RequireIdentity(user): RequireIdentity,
) -> ApiResult<Json<Vec<PortfolioHolding>>> {
    validate_user_id(&user_id)?;

    if user.user_id != user_id {
        warn!(requester = %user.user_id, target = %user_id, "Portfolio access denied");
        return Err(ApiError::Forbidden);
    }

    let holdings = state.store.holdings_for_user(&user_id).await?;
    let mut enriched = Vec::with_capacity(holdings.len());

    for holding in holdings {
        if holding.shares == 0 {
            continue;
        }

        let candles = match state
            .quotes
            .history(&holding.symbol, HistoryRange::TwoDays, Interval::OneDay)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!(symbol = %holding.symbol, error = %e, "Holding quote fetch failed");
                continue;
            }
        };

        let Some((price, change, change_percent)) = latest_change(&candles) else {
            warn!(symbol = %holding.symbol, "No price data for holding");
            continue;
        };

        let profile = state.quotes.profile(&holding.symbol).await.unwrap_or_default();

        let shares = Decimal::from(holding.shares);
        let total_value = (price * shares).round_dp(2);
        let gain_loss = ((price - holding.average_price) * shares).round_dp(2);
        let gain_loss_percent = if holding.average_price.is_zero() {
            Decimal::ZERO
        } else {
            ((price - holding.average_price) / holding.average_price * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };

        enriched.push(PortfolioHolding {
            name: profile
                .name
                .unwrap_or_else(|| holding.symbol.to_string()),
            symbol: holding.symbol,
            price,
            change,
            change_percent,
            shares: holding.shares,
            total_value,
            purchase_price: holding.average_price,
            gain_loss,
            gain_loss_percent,
        });
    }

    info!(user_id = %user_id, holdings = enriched.len(), "Portfolio fetched");
    Ok(Json(enriched))
}

/// POST /api/portfolio/transaction - 거래 실행.
///
/// 매수는 가중 평균 단가로 합산하고, 매도는 비례 차감하며 수량이
/// 0이 되면 보유를 삭제합니다. 초과 매도는 400입니다.
#[utoipa::path(
    post,
    path = "/api/portfolio/transaction",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "거래 완료", body = TransactionResponse),
        (status = 400, description = "잘못된 거래 데이터 또는 초과 매도", body = ErrorBody),
        (status = 401, description = "인증 필요", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "portfolio"
)]
pub async fn execute_transaction(
    State(state): State<Arc<AppState>>,
    RequireIdentity(user): RequireIdentity,
    Json(request): Json<TransactionRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    request
        .validate()
        .map_err(|_| ApiError::Validation("Invalid transaction data".to_string()))?;

    let symbol = Symbol::parse(request.symbol.trim().to_uppercase().as_str())
        .map_err(|_| ApiError::Validation("Invalid transaction data".to_string()))?;

    // 거래 기록을 먼저 남긴다
    let transaction = Transaction::new(
        user.user_id.clone(),
        symbol.clone(),
        request.kind,
        request.shares,
        request.price,
    );
    state.store.record_transaction(transaction).await?;

    let existing = state.store.holding(&user.user_id, &symbol).await?;

    match request.kind {
        TransactionKind::Buy => {
            let holding = match existing {
                Some(mut holding) => {
                    holding
                        .apply_buy(request.shares, request.price)
                        .map_err(|e| ApiError::Validation(e.to_string()))?;
                    holding
                }
                None => Holding::open(
                    user.user_id.clone(),
                    symbol.clone(),
                    request.shares,
                    request.price,
                ),
            };
            state.store.upsert_holding(holding).await?;
        }

        TransactionKind::Sell => {
            let mut holding = existing.ok_or_else(|| {
                ApiError::Validation("Cannot sell shares you don't own".to_string())
            })?;

            let outcome = holding.apply_sell(request.shares).map_err(|e| {
                ApiError::Validation(match e {
                    stockwatch_core::TradeError::OverSell { owned, requested } => format!(
                        "Cannot sell {} shares, only own {}",
                        requested, owned
                    ),
                    other => other.to_string(),
                })
            })?;

            match outcome {
                SellOutcome::Closed => {
                    state.store.delete_holding(&user.user_id, &symbol).await?;
                }
                SellOutcome::Reduced => {
                    state.store.upsert_holding(holding).await?;
                }
            }
        }
    }

    info!(
        user_id = %user.user_id,
        symbol = %symbol,
        kind = %request.kind,
        shares = request.shares,
        "Transaction executed"
    );

    Ok(Json(TransactionResponse {
        success: true,
        message: format!(
            "Successfully {} {} shares of {}",
            request.kind, request.shares, symbol
        ),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_test_state_with, StaticIdentity, StaticQuotes};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let quotes = StaticQuotes::new().with_closes("AAPL", &[dec!(100), dec!(110)]);
        let identity = StaticIdentity::new()
            .with_token("token-1", "user-1")
            .with_token("token-2", "user-2");
        Arc::new(create_test_state_with(quotes, identity))
    }

    fn test_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/api/portfolio/{user_id}", get(get_portfolio))
            .route("/api/portfolio/transaction", post(execute_transaction))
            .with_state(state)
    }

    fn transaction_body(kind: &str, shares: u64, price: f64) -> String {
        format!(
            r#"{{"symbol": "AAPL", "type": "{}", "shares": {}, "price": {}}}"#,
            kind, shares, price
        )
    }

    fn post_transaction(token: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/portfolio/transaction")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_portfolio_requires_auth() {
        let app = test_app(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio/user-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_portfolio_owner_mismatch_is_403() {
        let app = test_app(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio/user-1")
                    .header(header::AUTHORIZATION, "Bearer token-2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_buy_then_fetch_enriched_portfolio() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_transaction("token-1", transaction_body("buy", 10, 100.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/portfolio/user-1")
                    .header(header::AUTHORIZATION, "Bearer token-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let holdings = body.as_array().unwrap();

        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0]["symbol"], "AAPL");
        assert_eq!(holdings[0]["shares"], 10);
        assert_eq!(holdings[0]["price"], 110.0);
        assert_eq!(holdings[0]["totalValue"], 1100.0);
        assert_eq!(holdings[0]["gainLoss"], 100.0);
        assert_eq!(holdings[0]["gainLossPercent"], 10.0);
    }

    #[tokio::test]
    async fn test_sell_to_zero_deletes_holding() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        // 100에 10주 매수 후 아무 가격에나 10주 매도
        let response = app
            .clone()
            .oneshot(post_transaction("token-1", transaction_body("buy", 10, 100.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_transaction("token-1", transaction_body("sell", 10, 55.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let symbol = Symbol::parse("AAPL").unwrap();
        assert!(state
            .store
            .holding("user-1", &symbol)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_over_sell_is_400() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_transaction("token-1", transaction_body("buy", 5, 100.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_transaction("token-1", transaction_body("sell", 6, 100.0)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("only own 5"));
    }

    #[tokio::test]
    async fn test_sell_without_holding_is_400() {
        let app = test_app(test_state());

        let response = app
            .oneshot(post_transaction("token-1", transaction_body("sell", 1, 100.0)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_transaction_data_is_400() {
        let app = test_app(test_state());

        // shares = 0
        let response = app
            .clone()
            .oneshot(post_transaction("token-1", transaction_body("buy", 0, 100.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // 음수 가격
        let response = app
            .oneshot(post_transaction("token-1", transaction_body("buy", 1, -5.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_buy_accumulates_weighted_average() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        for (shares, price) in [(10u64, 100.0f64), (10, 200.0)] {
            let response = app
                .clone()
                .oneshot(post_transaction(
                    "token-1",
                    transaction_body("buy", shares, price),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let symbol = Symbol::parse("AAPL").unwrap();
        let holding = state
            .store
            .holding("user-1", &symbol)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(holding.shares, 20);
        assert_eq!(holding.average_price, dec!(150));
    }
}
