//! 구독 레지스트리.
//!
//! 어떤 연결이 어떤 심볼의 업데이트를 원하는지 추적하는
//! 프로세스 전역 상태. 심볼 → 연결 집합 인덱스가 권위 있는
//! 원본이며, 세션별 심볼 집합은 송신 측 필터링에 사용됩니다.
//!
//! 불변 조건: 어떤 연산 후에도 빈 연결 집합을 가진 심볼 엔트리는
//! 남지 않습니다. 엔트리가 사라지면 리프레시 루프도 해당 심볼을
//! 더 이상 폴링하지 않습니다.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use stockwatch_core::{PriceUpdate, Symbol, SymbolError};

use super::messages::PriceBatch;

/// 구독 요청 에러.
///
/// 요청 전체가 거부되며 부분 적용은 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("Invalid symbols list")]
    Empty,
    #[error("Too many symbols in subscription (max {0})")]
    TooMany(usize),
    #[error("Invalid symbol format detected: {raw} ({source})")]
    InvalidSymbol {
        raw: String,
        source: SymbolError,
    },
    #[error("Unknown connection")]
    UnknownConnection,
}

/// 클라이언트 세션 정보.
#[derive(Debug)]
pub struct ClientSession {
    /// 연결 ID
    pub id: Uuid,
    /// 사용자 ID (인증된 경우)
    pub user_id: Option<String>,
    /// 이 연결이 구독 중인 심볼 집합
    pub symbols: HashSet<Symbol>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<Uuid, ClientSession>,
    symbols: HashMap<Symbol, HashSet<Uuid>>,
}

impl RegistryInner {
    /// 심볼 집합에서 연결 제거, 집합이 비면 엔트리 삭제.
    fn remove_subscriber(&mut self, symbol: &Symbol, connection_id: Uuid) {
        if let Some(subscribers) = self.symbols.get_mut(symbol) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                self.symbols.remove(symbol);
            }
        }
    }
}

/// 구독 레지스트리.
///
/// 연결 수명주기와 심볼 구독을 관리하고, 리프레시 루프가 만든
/// 가격 배치를 브로드캐스트 채널로 팬아웃합니다.
pub struct SubscriptionRegistry {
    updates_tx: broadcast::Sender<PriceBatch>,
    inner: RwLock<RegistryInner>,
    max_symbols_per_subscribe: usize,
}

impl SubscriptionRegistry {
    /// 새 레지스트리 생성.
    ///
    /// # Arguments
    ///
    /// * `capacity` - 브로드캐스트 채널 버퍼 크기
    /// * `max_symbols_per_subscribe` - 구독 요청당 심볼 상한
    pub fn new(capacity: usize, max_symbols_per_subscribe: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            updates_tx: tx,
            inner: RwLock::new(RegistryInner::default()),
            max_symbols_per_subscribe,
        }
    }

    /// 새 연결 등록.
    ///
    /// # Returns
    ///
    /// 가격 배치 수신기
    pub async fn register(
        &self,
        connection_id: Uuid,
        user_id: Option<String>,
    ) -> broadcast::Receiver<PriceBatch> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(
            connection_id,
            ClientSession {
                id: connection_id,
                user_id,
                symbols: HashSet::new(),
            },
        );
        self.updates_tx.subscribe()
    }

    /// 연결 종료 처리.
    ///
    /// 이 연결이 들고 있던 모든 구독을 해제합니다. 연결 해제 시
    /// 정확히 한 번 호출되어야 합니다.
    pub async fn drop_connection(&self, connection_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.remove(&connection_id) {
            for symbol in session.symbols {
                inner.remove_subscriber(&symbol, connection_id);
            }
        }
    }

    /// 심볼 구독.
    ///
    /// 전부 아니면 전무: 목록이 비었거나, 상한을 넘거나, 하나라도
    /// 문법에 어긋나면 아무것도 적용하지 않고 거부합니다.
    ///
    /// # Returns
    ///
    /// 수락된 심볼 목록 (정렬, 중복 제거)
    pub async fn subscribe(
        &self,
        connection_id: Uuid,
        raw_symbols: &[String],
    ) -> Result<Vec<Symbol>, SubscribeError> {
        if raw_symbols.is_empty() {
            return Err(SubscribeError::Empty);
        }
        if raw_symbols.len() > self.max_symbols_per_subscribe {
            return Err(SubscribeError::TooMany(self.max_symbols_per_subscribe));
        }

        // 적용 전에 전체 검증
        let mut symbols = BTreeSet::new();
        for raw in raw_symbols {
            let symbol = Symbol::parse(raw).map_err(|source| SubscribeError::InvalidSymbol {
                raw: raw.clone(),
                source,
            })?;
            symbols.insert(symbol);
        }

        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&connection_id) {
            return Err(SubscribeError::UnknownConnection);
        }

        for symbol in &symbols {
            inner
                .symbols
                .entry(symbol.clone())
                .or_default()
                .insert(connection_id);
        }
        if let Some(session) = inner.sessions.get_mut(&connection_id) {
            session.symbols.extend(symbols.iter().cloned());
        }

        Ok(symbols.into_iter().collect())
    }

    /// 심볼 구독 해제.
    ///
    /// 구독 중이 아니거나 문법에 어긋나는 심볼은 no-op입니다.
    ///
    /// # Returns
    ///
    /// 유효하게 파싱된 심볼 목록 (ack 용)
    pub async fn unsubscribe(&self, connection_id: Uuid, raw_symbols: &[String]) -> Vec<Symbol> {
        let symbols: Vec<Symbol> = raw_symbols
            .iter()
            .filter_map(|raw| Symbol::parse(raw).ok())
            .collect();

        let mut inner = self.inner.write().await;
        for symbol in &symbols {
            inner.remove_subscriber(symbol, connection_id);
        }
        if let Some(session) = inner.sessions.get_mut(&connection_id) {
            for symbol in &symbols {
                session.symbols.remove(symbol);
            }
        }

        symbols
    }

    /// 구독자가 있는 모든 심볼의 스냅샷.
    ///
    /// 리프레시 루프가 사이클마다 호출합니다. 락은 복사 직후
    /// 해제되므로 이후의 I/O와 겹치지 않습니다.
    pub async fn active_symbols(&self) -> HashSet<Symbol> {
        self.inner.read().await.symbols.keys().cloned().collect()
    }

    /// 가격 배치를 특정 연결의 구독으로 필터링.
    ///
    /// 브로드캐스트는 모든 연결에 같은 배치를 전달하므로, 각 연결의
    /// 송신 경로가 자신의 구독 집합으로 잘라낸 뒤에만 내보냅니다.
    pub async fn filtered_batch(
        &self,
        connection_id: Uuid,
        batch: &HashMap<Symbol, PriceUpdate>,
    ) -> HashMap<Symbol, PriceUpdate> {
        let inner = self.inner.read().await;
        let Some(session) = inner.sessions.get(&connection_id) else {
            return HashMap::new();
        };
        batch
            .iter()
            .filter(|(symbol, _)| session.symbols.contains(*symbol))
            .map(|(symbol, update)| (symbol.clone(), update.clone()))
            .collect()
    }

    /// 특정 연결이 구독 중인 심볼의 스냅샷.
    pub async fn symbols_for(&self, connection_id: Uuid) -> HashSet<Symbol> {
        self.inner
            .read()
            .await
            .sessions
            .get(&connection_id)
            .map(|s| s.symbols.clone())
            .unwrap_or_default()
    }

    /// 연결 수.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// 구독자가 있는 심볼 수.
    pub async fn active_symbol_count(&self) -> usize {
        self.inner.read().await.symbols.len()
    }

    /// 가격 배치 브로드캐스트.
    ///
    /// # Returns
    ///
    /// 배치를 받은 수신자 수 (구독자가 없으면 0)
    pub fn broadcast(&self, updates: HashMap<Symbol, PriceUpdate>) -> usize {
        self.updates_tx
            .send(Arc::new(updates))
            .unwrap_or(0)
    }

    #[cfg(test)]
    async fn assert_no_empty_entries(&self) {
        let inner = self.inner.read().await;
        assert!(
            inner.symbols.values().all(|set| !set.is_empty()),
            "registry holds a symbol with no subscribers"
        );
    }
}

/// 공유 가능한 레지스트리 타입.
pub type SharedRegistry = Arc<SubscriptionRegistry>;

/// 새로운 공유 레지스트리 생성.
pub fn create_registry(capacity: usize, max_symbols_per_subscribe: usize) -> SharedRegistry {
    Arc::new(SubscriptionRegistry::new(
        capacity,
        max_symbols_per_subscribe,
    ))
}
