//! OpenAPI 문서화 설정.
//!
//! utoipa로 REST API의 OpenAPI 3 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새 엔드포인트를 추가할 때:
//! 1. 요청/응답 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `paths(...)` / `components(schemas(...))`에 등록

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorBody;
use crate::routes::{
    HealthResponse, IndexQuote, PortfolioHolding, StockDetail, SuccessResponse,
    TransactionRequest, TransactionResponse, WatchlistUpdateRequest,
};

/// Stockwatch API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockwatch API",
        description = "시장 데이터 집계 및 포트폴리오 API. REST + WebSocket 실시간 가격 스트림.",
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::market::get_market_indices,
        crate::routes::market::get_trending_stocks,
        crate::routes::stocks::get_stock,
        crate::routes::search::search_stocks,
        crate::routes::portfolio::get_portfolio,
        crate::routes::portfolio::execute_transaction,
        crate::routes::watchlist::get_watchlist,
        crate::routes::watchlist::update_watchlist,
    ),
    components(schemas(
        HealthResponse,
        IndexQuote,
        StockDetail,
        PortfolioHolding,
        TransactionRequest,
        TransactionResponse,
        WatchlistUpdateRequest,
        SuccessResponse,
        ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "헬스 체크"),
        (name = "market", description = "시장 개요"),
        (name = "stocks", description = "종목 조회/검색"),
        (name = "portfolio", description = "포트폴리오 관리"),
        (name = "watchlist", description = "관심종목 관리"),
    )
)]
pub struct ApiDoc;

/// Bearer 토큰 보안 스킴 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI 라우터 생성.
pub fn swagger_ui_router() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_builds() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();

        assert!(json.contains("/api/stock/{symbol}"));
        assert!(json.contains("/api/portfolio/transaction"));
        assert!(json.contains("StockDetail"));
    }
}
