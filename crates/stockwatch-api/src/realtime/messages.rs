//! WebSocket 메시지 타입.
//!
//! 클라이언트-서버 간 교환되는 이벤트 정의. 모든 이벤트는
//! `type` 필드로 태깅된 JSON입니다.
//!
//! # 클라이언트 → 서버
//!
//! ```json
//! {"type": "subscribe_prices", "symbols": ["AAPL", "MSFT"]}
//! {"type": "unsubscribe_prices", "symbols": ["AAPL"]}
//! ```
//!
//! # 서버 → 클라이언트
//!
//! ```json
//! {"type": "connected", "status": "...", "authenticated": true}
//! {"type": "subscribed", "symbols": ["AAPL"], "status": "..."}
//! {"type": "price_updates", "AAPL": {"symbol": "AAPL", "price": 105.0, ...}}
//! {"type": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use stockwatch_core::{PriceUpdate, Symbol};

/// 브로드캐스트 채널로 흐르는 가격 업데이트 배치.
///
/// 수신자마다 복제되므로 Arc로 감쌉니다. 연결별 필터링은
/// 각 연결의 송신 태스크가 수행합니다.
pub type PriceBatch = Arc<HashMap<Symbol, PriceUpdate>>;

/// WebSocket 에러.
#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 클라이언트에서 서버로 보내는 이벤트.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// 가격 업데이트 구독
    SubscribePrices {
        /// 구독할 심볼 목록
        symbols: Vec<String>,
    },
    /// 가격 업데이트 구독 해제
    UnsubscribePrices {
        /// 구독 해제할 심볼 목록
        symbols: Vec<String>,
    },
}

impl ClientEvent {
    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }
}

/// 서버에서 클라이언트로 보내는 이벤트.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 연결 완료
    Connected {
        /// 상태 메시지
        status: String,
        /// 인증 여부
        authenticated: bool,
    },
    /// 구독 확인
    Subscribed {
        /// 수락된 심볼 목록
        symbols: Vec<Symbol>,
        /// 상태 메시지
        status: String,
    },
    /// 구독 해제 확인
    Unsubscribed {
        /// 해제된 심볼 목록
        symbols: Vec<Symbol>,
        /// 상태 메시지
        status: String,
    },
    /// 가격 업데이트 배치 (심볼 → 업데이트, 연결별로 필터링됨)
    PriceUpdates(HashMap<Symbol, PriceUpdate>),
    /// 에러
    Error {
        /// 에러 메시지
        message: String,
        /// 재시도까지 대기 시간 (rate limit 거부에만 포함)
        #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

impl ServerEvent {
    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::from)
    }

    /// 연결 확인 이벤트 생성.
    pub fn connected(authenticated: bool) -> Self {
        ServerEvent::Connected {
            status: "Connected to stock price updates".to_string(),
            authenticated,
        }
    }

    /// 에러 이벤트 생성.
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Rate limit 거부 이벤트 생성.
    pub fn rate_limited(retry_after: u64) -> Self {
        ServerEvent::Error {
            message: "Rate limit exceeded".to_string(),
            retry_after: Some(retry_after),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_client_event_subscribe() {
        let json = r#"{"type": "subscribe_prices", "symbols": ["AAPL", "MSFT"]}"#;
        let event = ClientEvent::from_json(json).unwrap();

        match event {
            ClientEvent::SubscribePrices { symbols } => {
                assert_eq!(symbols, vec!["AAPL", "MSFT"]);
            }
            _ => panic!("Expected SubscribePrices"),
        }
    }

    #[test]
    fn test_client_event_unsubscribe() {
        let json = r#"{"type": "unsubscribe_prices", "symbols": ["AAPL"]}"#;
        let event = ClientEvent::from_json(json).unwrap();

        assert!(matches!(event, ClientEvent::UnsubscribePrices { .. }));
    }

    #[test]
    fn test_malformed_payload_is_error() {
        assert!(ClientEvent::from_json("not json").is_err());
        assert!(ClientEvent::from_json(r#"{"type": "unknown_event"}"#).is_err());
        assert!(ClientEvent::from_json(r#"{"symbols": ["AAPL"]}"#).is_err());
    }

    #[test]
    fn test_connected_event_shape() {
        let json = ServerEvent::connected(true).to_json().unwrap();
        assert!(json.contains(r#""type":"connected""#));
        assert!(json.contains(r#""authenticated":true"#));
    }

    #[test]
    fn test_price_updates_inline_map() {
        let symbol = Symbol::parse("AAPL").unwrap();
        let mut updates = HashMap::new();
        updates.insert(
            symbol.clone(),
            PriceUpdate {
                symbol,
                price: dec!(105),
                change: dec!(5),
                change_percent: dec!(5.00),
                timestamp: Utc::now(),
            },
        );

        let json = ServerEvent::PriceUpdates(updates).to_json().unwrap();

        // 태그와 심볼 키가 같은 레벨에 위치
        assert!(json.contains(r#""type":"price_updates""#));
        assert!(json.contains(r#""AAPL""#));
        assert!(json.contains(r#""changePercent""#));
    }

    #[test]
    fn test_rate_limited_event_has_retry_after() {
        let json = ServerEvent::rate_limited(10).to_json().unwrap();
        assert!(json.contains(r#""retryAfter":10"#));

        let json = ServerEvent::error("boom").to_json().unwrap();
        assert!(!json.contains("retryAfter"));
    }
}
