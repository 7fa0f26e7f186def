//! 시간 제한 인메모리 캐시.
//!
//! 키마다 저장 시각을 함께 기록하고, TTL이 지난 엔트리는 없는 것으로
//! 취급합니다. 읽히지 않은 만료 엔트리는 자동으로 제거되지 않으므로
//! 장기 실행 시 [`TtlCache::sweep`]을 주기적으로 호출해야 합니다.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// TTL 기반 응답 캐시.
///
/// 값은 JSON으로 보관하며, 타입 변환은 호출자 쪽 헬퍼에서 처리합니다.
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    /// 지정 TTL로 새 캐시 생성.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 키 조회.
    ///
    /// 키가 없거나 `age >= TTL`이면 None. 만료 엔트리를 절대
    /// 반환하지 않습니다.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// 현재 시각 기준으로 값 저장. 기존 엔트리는 덮어씁니다.
    pub async fn set(&self, key: impl Into<String>, value: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// 만료된 엔트리 제거.
    ///
    /// # Returns
    ///
    /// 제거된 엔트리 수
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// 저장된 엔트리 수 (만료 여부 무관).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 캐시가 비어 있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
