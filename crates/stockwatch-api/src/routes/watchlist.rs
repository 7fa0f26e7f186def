//! 관심종목 endpoint.
//!
//! - `GET /api/watchlist/{user_id}` - 심볼 목록 조회
//! - `POST /api/watchlist/{user_id}` - 심볼 목록 전체 교체
//!
//! 인증 필수, 본인 목록만 접근 가능합니다.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use stockwatch_core::{Symbol, Watchlist};

use crate::auth::RequireIdentity;
use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::routes::validate_user_id;
use crate::state::AppState;

/// 관심종목 교체 요청.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WatchlistUpdateRequest {
    /// 새 심볼 목록
    pub symbols: Vec<String>,
}

/// 성공 응답.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    /// 성공 여부
    pub success: bool,
    /// 결과 메시지
    pub message: String,
}

/// 소유자 확인 공통 처리.
fn check_owner(requester: &str, target: &str) -> Result<(), ApiError> {
    if requester != target {
        warn!(requester = %requester, target = %target, "Watchlist access denied");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// GET /api/watchlist/{user_id} - 관심종목 조회.
///
/// 목록이 없으면 빈 배열을 반환합니다.
#[utoipa::path(
    get,
    path = "/api/watchlist/{user_id}",
    params(("user_id" = String, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "심볼 목록", body = [String]),
        (status = 401, description = "인증 필요", body = ErrorBody),
        (status = 403, description = "본인 목록 아님", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "watchlist"
)]
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    RequireIdentity(user): RequireIdentity,
) -> ApiResult<Json<Vec<Symbol>>> {
    validate_user_id(&user_id)?;
    check_owner(&user.user_id, &user_id)?;

    let symbols = state
        .store
        .watchlist(&user_id)
        .await?
        .map(|watchlist| watchlist.symbols)
        .unwrap_or_default();

    info!(user_id = %user_id, count = symbols.len(), "Watchlist fetched");
    Ok(Json(symbols))
}

/// POST /api/watchlist/{user_id} - 관심종목 전체 교체.
///
/// 목록의 모든 심볼이 문법을 통과해야 하며, 하나라도 어긋나면
/// 아무것도 바꾸지 않고 400을 반환합니다.
#[utoipa::path(
    post,
    path = "/api/watchlist/{user_id}",
    params(("user_id" = String, Path, description = "사용자 ID")),
    request_body = WatchlistUpdateRequest,
    responses(
        (status = 200, description = "교체 완료", body = SuccessResponse),
        (status = 400, description = "심볼 문법 위반", body = ErrorBody),
        (status = 401, description = "인증 필요", body = ErrorBody),
        (status = 403, description = "본인 목록 아님", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "watchlist"
)]
pub async fn update_watchlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    RequireIdentity(user): RequireIdentity,
    Json(request): Json<WatchlistUpdateRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    validate_user_id(&user_id)?;
    check_owner(&user.user_id, &user_id)?;

    let mut symbols = Vec::with_capacity(request.symbols.len());
    for raw in &request.symbols {
        let symbol = Symbol::parse(raw).map_err(|_| {
            ApiError::Validation("Invalid symbol format detected".to_string())
        })?;
        symbols.push(symbol);
    }

    let count = symbols.len();
    state
        .store
        .replace_watchlist(Watchlist::new(user_id.clone(), symbols))
        .await?;

    info!(user_id = %user_id, count, "Watchlist updated");
    Ok(Json(SuccessResponse {
        success: true,
        message: "Watchlist updated successfully".to_string(),
    }))
}
