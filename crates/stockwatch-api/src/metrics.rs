//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 실시간 엔진 메트릭을 수집하고
//! `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use uuid::Uuid;

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 패닉
///
/// 레코더가 이미 설치되어 있으면 패닉합니다.
pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("Failed to set histogram buckets")
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// 동적 경로 세그먼트를 플레이스홀더로 정규화.
///
/// 카디널리티 폭발을 막기 위해 심볼/ID 세그먼트를 라벨에서 제거합니다.
pub fn normalize_path(path: &str) -> String {
    let normalized: Vec<String> = path
        .split('/')
        .map(|segment| {
            if segment.is_empty() {
                return String::new();
            }
            if segment.chars().all(|c| c.is_ascii_digit()) || Uuid::parse_str(segment).is_ok() {
                return "{id}".to_string();
            }
            let symbol_like = segment.len() <= 12
                && segment.chars().any(|c| c.is_ascii_uppercase())
                && segment
                    .chars()
                    .all(|c| matches!(c, 'A'..='Z' | '0'..='9' | '^' | '%'));
            if symbol_like {
                // 심볼 세그먼트 (^는 %5E로 인코딩되어 올 수 있음)
                return "{symbol}".to_string();
            }
            segment.to_string()
        })
        .collect();

    normalized.join("/")
}

// ============================================================================
// 실시간 엔진 메트릭
// ============================================================================

/// WebSocket 연결 수 증가.
pub fn increment_websocket_connections() {
    gauge!("websocket_connections").increment(1.0);
}

/// WebSocket 연결 수 감소.
pub fn decrement_websocket_connections() {
    gauge!("websocket_connections").decrement(1.0);
}

/// 구독 중인 심볼 수 설정.
pub fn set_active_symbols(count: usize) {
    gauge!("realtime_active_symbols").set(count as f64);
}

/// 시세 조회 결과 기록.
pub fn record_quote_fetch(outcome: &'static str) {
    counter!("quote_fetches_total", "outcome" => outcome).increment(1);
}

/// 브로드캐스트된 가격 업데이트 수 기록.
pub fn record_price_broadcast(symbols: usize) {
    counter!("price_updates_broadcast_total").increment(symbols as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_symbols_and_ids() {
        assert_eq!(normalize_path("/api/stock/AAPL"), "/api/stock/{symbol}");
        assert_eq!(normalize_path("/api/stock/%5EGSPC"), "/api/stock/{symbol}");
        assert_eq!(normalize_path("/api/portfolio/12345"), "/api/portfolio/{id}");
        assert_eq!(
            normalize_path("/orders/123e4567-e89b-12d3-a456-426614174000"),
            "/orders/{id}"
        );
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(
            normalize_path("/api/market-indices"),
            "/api/market-indices"
        );
    }
}
