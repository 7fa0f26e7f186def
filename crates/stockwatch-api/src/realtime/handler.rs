//! WebSocket 연결 handler.
//!
//! 연결 수명주기: 업그레이드 → (선택적) 토큰 인증 → 레지스트리 등록 →
//! `connected` 이벤트 → 수신/송신 select 루프 → 연결 해제 시
//! `drop_connection`으로 구독 전부 회수.
//!
//! 가격 배치는 브로드캐스트 채널로 들어오며, 연결별 구독 집합으로
//! 필터링한 뒤에만 내보냅니다.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{ClientEvent, PriceBatch, ServerEvent};
use crate::metrics::{decrement_websocket_connections, increment_websocket_connections};
use crate::middleware::{LimitClass, RateLimitDecision};
use crate::state::AppState;

/// 연결 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct WsConnectQuery {
    /// 인증 토큰 (선택)
    pub token: Option<String>,
}

/// WebSocket 업그레이드 핸들러.
///
/// # 엔드포인트
///
/// `GET /ws?token=<jwt>`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsConnectQuery>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.token, peer_addr))
}

/// 연결별 컨텍스트.
struct Connection {
    id: Uuid,
    user_id: Option<String>,
    peer_addr: Option<SocketAddr>,
}

impl Connection {
    /// Rate limit 식별자: 사용자 ID → 피어 IP → 연결 ID.
    fn rate_limit_identifier(&self) -> String {
        if let Some(user_id) = &self.user_id {
            return user_id.clone();
        }
        if let Some(addr) = self.peer_addr {
            return addr.ip().to_string();
        }
        self.id.to_string()
    }
}

/// WebSocket 연결 처리.
async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    token: Option<String>,
    peer_addr: Option<SocketAddr>,
) {
    let connection_id = Uuid::new_v4();

    // 인증은 선택 사항: 실패하면 익명으로 강등
    let user_id = match token {
        Some(token) => match state.identity.verify(&token).await {
            Ok(user) => {
                info!(%connection_id, user_id = %user.user_id, "Authenticated WebSocket connection");
                Some(user.user_id)
            }
            Err(e) => {
                warn!(%connection_id, error = %e, "WebSocket authentication failed");
                None
            }
        },
        None => None,
    };

    let connection = Connection {
        id: connection_id,
        user_id: user_id.clone(),
        peer_addr,
    };
    let authenticated = connection.user_id.is_some();

    increment_websocket_connections();
    let mut updates_rx = state.registry.register(connection_id, user_id).await;

    info!(%connection_id, authenticated, "WebSocket connected");

    if send_event(&mut socket, &ServerEvent::connected(authenticated))
        .await
        .is_err()
    {
        state.registry.drop_connection(connection_id).await;
        decrement_websocket_connections();
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(message)) => {
                        if !handle_client_message(&mut socket, &state, &connection, message).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%connection_id, error = %e, "WebSocket receive error");
                        break;
                    }
                    None => break,
                }
            }
            batch = updates_rx.recv() => {
                match batch {
                    Ok(batch) => {
                        if !forward_price_updates(&mut socket, &state, &connection, batch).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%connection_id, skipped, "WebSocket lagged behind price updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // 연결 해제: 구독 전부 회수 (정확히 한 번)
    state.registry.drop_connection(connection_id).await;
    decrement_websocket_connections();

    info!(%connection_id, "WebSocket disconnected");
}

/// 가격 배치를 이 연결의 구독으로 필터링해 전송.
///
/// # Returns
///
/// `false`면 연결 종료
async fn forward_price_updates(
    socket: &mut WebSocket,
    state: &AppState,
    connection: &Connection,
    batch: PriceBatch,
) -> bool {
    let filtered = state.registry.filtered_batch(connection.id, &batch).await;
    if filtered.is_empty() {
        return true;
    }

    send_event(socket, &ServerEvent::PriceUpdates(filtered))
        .await
        .is_ok()
}

/// 클라이언트 메시지 처리.
///
/// # Returns
///
/// `true`면 연결 유지, `false`면 연결 종료
async fn handle_client_message(
    socket: &mut WebSocket,
    state: &AppState,
    connection: &Connection,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => match ClientEvent::from_json(&text) {
            Ok(event) => process_client_event(socket, state, connection, event).await,
            Err(e) => {
                warn!(connection_id = %connection.id, error = %e, "Invalid WebSocket message");
                // 잘못된 페이로드는 에러 이벤트로 응답하고 연결은 유지
                let _ = send_event(socket, &ServerEvent::error("Invalid subscription data")).await;
                true
            }
        },
        Message::Binary(_) => {
            warn!(connection_id = %connection.id, "Binary messages not supported");
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(connection_id = %connection.id, "Close message received");
            false
        }
    }
}

/// 파싱된 클라이언트 이벤트 처리.
async fn process_client_event(
    socket: &mut WebSocket,
    state: &AppState,
    connection: &Connection,
    event: ClientEvent,
) -> bool {
    // 구독 이벤트는 realtime 클래스로 admission control
    if !state.settings.rate_limit.disabled {
        let identifier = connection.rate_limit_identifier();
        if let RateLimitDecision::Limited { retry_after } = state
            .limiter
            .check(LimitClass::Realtime, &identifier)
            .await
        {
            warn!(
                connection_id = %connection.id,
                identifier = %identifier,
                "Realtime event rate limited"
            );
            let _ = send_event(socket, &ServerEvent::rate_limited(retry_after)).await;
            return true;
        }
    }

    match event {
        ClientEvent::SubscribePrices { symbols } => {
            match state.registry.subscribe(connection.id, &symbols).await {
                Ok(accepted) => {
                    debug!(connection_id = %connection.id, symbols = ?accepted, "Subscribed");

                    // 첫 구독 성공이 리프레시 루프를 깨운다
                    state.refresher.start_if_idle();

                    let response = ServerEvent::Subscribed {
                        symbols: accepted,
                        status: "Subscribed to price updates".to_string(),
                    };
                    send_event(socket, &response).await.is_ok()
                }
                Err(e) => {
                    warn!(connection_id = %connection.id, error = %e, "Subscribe rejected");
                    send_event(socket, &ServerEvent::error(e.to_string()))
                        .await
                        .is_ok()
                }
            }
        }

        ClientEvent::UnsubscribePrices { symbols } => {
            let removed = state.registry.unsubscribe(connection.id, &symbols).await;
            debug!(connection_id = %connection.id, symbols = ?removed, "Unsubscribed");

            let response = ServerEvent::Unsubscribed {
                symbols: removed,
                status: "Unsubscribed from price updates".to_string(),
            };
            send_event(socket, &response).await.is_ok()
        }
    }
}

/// 이벤트를 JSON으로 직렬화해 소켓으로 전송.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize server event");
            Ok(())
        }
    }
}
