//! 실시간 구독/브로드캐스트 엔진.
//!
//! 시스템의 핵심: 어떤 클라이언트가 어떤 심볼을 원하는지 추적하고
//! ([`registry`]), 주기적으로 시세 소스를 폴링해 배치를 만들고
//! ([`refresher`]), 관심 있는 구독자에게만 팬아웃합니다
//! ([`handler`]).
//!
//! # 이벤트 흐름
//!
//! ```text
//! client ── subscribe_prices ──▶ SubscriptionRegistry
//!                                      │ active_symbols()
//!                                      ▼
//!                               PriceRefresher (30s 주기)
//!                                      │ broadcast(batch)
//!                                      ▼
//!                               broadcast channel ──▶ 연결별 필터 ──▶ price_updates
//! ```

pub mod handler;
pub mod messages;
pub mod refresher;
pub mod registry;

pub use handler::{websocket_handler, WsConnectQuery};
pub use messages::{ClientEvent, PriceBatch, ServerEvent, WsError};
pub use refresher::{CycleOutcome, PriceRefresher, RefresherHandle};
pub use registry::{
    create_registry, ClientSession, SharedRegistry, SubscribeError, SubscriptionRegistry,
};
