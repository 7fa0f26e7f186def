//! Stockwatch API 서버.
//!
//! Axum 기반 REST + WebSocket 서버를 시작합니다.
//! 시세 집계, 검색, 포트폴리오/관심종목, 실시간 가격 스트림을
//! 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use stockwatch_api::metrics::setup_metrics_recorder;
use stockwatch_api::middleware::{metrics_layer, security_headers};
use stockwatch_api::openapi::swagger_ui_router;
use stockwatch_api::realtime::websocket_handler;
use stockwatch_api::routes::create_api_router;
use stockwatch_api::state::AppState;
use stockwatch_api::store::MemoryStore;
use stockwatch_api::JwtVerifier;
use stockwatch_core::{init_logging, AuthConfig, QuoteSourceKind, Settings};
use stockwatch_data::{SharedQuoteProvider, SimulatedQuotes, YahooChartClient};

/// 설정에 따라 시세 소스 collaborator 생성.
fn create_quote_provider(settings: &Settings) -> SharedQuoteProvider {
    match settings.quotes.source {
        QuoteSourceKind::Yahoo => {
            info!(base_url = %settings.quotes.base_url, "Using Yahoo chart quote source");
            Arc::new(YahooChartClient::new(&settings.quotes))
        }
        QuoteSourceKind::Simulated => {
            warn!(
                "Using simulated quote source (set STOCKWATCH__QUOTES__SOURCE=yahoo for real data)"
            );
            Arc::new(SimulatedQuotes::new())
        }
    }
}

/// CORS 미들웨어 구성.
///
/// 설정에 origin 목록이 있으면 해당 origin만 허용하고, 비어 있으면
/// 개발 모드로 간주해 모든 origin을 허용합니다.
fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins = &settings.server.cors_origins;

    let allow_origin = if origins.is_empty() {
        warn!("CORS origins not configured, allowing any origin (development mode)");
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        if parsed.is_empty() {
            warn!("CORS origins configured but none are valid, allowing any");
            AllowOrigin::any()
        } else {
            info!(count = parsed.len(), "CORS configured with allowed origins");
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = Duration::from_secs(state.settings.server.request_timeout_secs);
    let cors = cors_layer(&state.settings);

    // 메트릭 라우터 (별도 상태, rate limit 제외)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    // REST + WebSocket 라우터
    let api_router = create_api_router(&state)
        .route("/ws", get(websocket_handler))
        .with_state(state);

    Router::new()
        .merge(metrics_router)
        .merge(api_router)
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        // 보안 응답 헤더
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
}

/// 주기적 유지보수 태스크 시작.
///
/// 만료된 캐시 엔트리와 비어 있는 rate limit 윈도우를 정리해
/// 메모리가 무한히 자라는 것을 막습니다.
fn start_maintenance(state: Arc<AppState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let swept_cache = state.cache.sweep().await;
                    let swept_windows = state.limiter.sweep().await;
                    if swept_cache > 0 || swept_windows > 0 {
                        tracing::debug!(swept_cache, swept_windows, "Maintenance sweep");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Maintenance task stopped");
                    break;
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 설정 로드
    let settings = match Settings::load_default() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings ({e}), using defaults");
            Settings::default()
        }
    };

    // tracing 초기화
    init_logging(&settings.logging);

    info!("Starting Stockwatch API server...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| {
            anyhow::anyhow!(
                "invalid server address {}:{} ({e})",
                settings.server.host,
                settings.server.port
            )
        })?;

    if settings.auth.jwt_secret == AuthConfig::default().jwt_secret {
        warn!("JWT_SECRET not set, using default (INSECURE for development only)");
    }

    // Collaborator 조립: 시세 소스, 저장소, identity provider
    let quotes = create_quote_provider(&settings);
    let identity = Arc::new(JwtVerifier::new(settings.auth.jwt_secret.clone()));
    let store = Arc::new(MemoryStore::new());
    warn!("Using in-memory store, data is not persisted across restarts");

    let state = Arc::new(AppState::new(settings, quotes, store, identity));

    info!(
        version = %state.version,
        rate_limit_disabled = state.settings.rate_limit.disabled,
        "Application state initialized"
    );

    // 전역 종료 토큰 (백그라운드 태스크에 전파)
    let shutdown_token = CancellationToken::new();
    start_maintenance(Arc::clone(&state), shutdown_token.clone());

    // 라우터 생성
    let app = create_router(Arc::clone(&state), metrics_handle);

    // 서버 시작
    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("Metrics available at http://{}/metrics", addr);
    info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
    .await?;

    // 종료: 리프레시 루프와 유지보수 태스크에 정지 신호 전파
    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();
    state.shutdown();

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
