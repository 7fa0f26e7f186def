//! 포트폴리오/관심종목 저장소.
//!
//! 영속화 엔진 내부는 이 서비스의 관심사가 아니므로, 저장소는
//! 불투명한 collaborator trait으로 다룹니다. 기본 구현은
//! 인메모리 [`MemoryStore`]입니다.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use stockwatch_core::{Holding, Symbol, Transaction, Watchlist};

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 저장소 접근 불가
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 포트폴리오/관심종목 저장소.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// 사용자의 전체 보유 종목 조회.
    async fn holdings_for_user(&self, user_id: &str) -> Result<Vec<Holding>, StoreError>;

    /// 특정 종목 보유 조회.
    async fn holding(
        &self,
        user_id: &str,
        symbol: &Symbol,
    ) -> Result<Option<Holding>, StoreError>;

    /// 보유 종목 생성/갱신.
    async fn upsert_holding(&self, holding: Holding) -> Result<(), StoreError>;

    /// 보유 종목 삭제.
    async fn delete_holding(&self, user_id: &str, symbol: &Symbol) -> Result<(), StoreError>;

    /// 거래 기록 저장.
    async fn record_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    /// 사용자의 관심종목 조회.
    async fn watchlist(&self, user_id: &str) -> Result<Option<Watchlist>, StoreError>;

    /// 관심종목 전체 교체.
    async fn replace_watchlist(&self, watchlist: Watchlist) -> Result<(), StoreError>;
}

/// 공유 가능한 저장소 타입.
pub type SharedStore = Arc<dyn PortfolioStore>;
