//! 인메모리 저장소 구현.
//!
//! 단일 프로세스 개발/테스트용. 프로세스 종료 시 데이터가 사라집니다.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use stockwatch_core::{Holding, Symbol, Transaction, Watchlist};

use super::{PortfolioStore, StoreError};

/// RwLock 맵 기반 인메모리 저장소.
#[derive(Default)]
pub struct MemoryStore {
    holdings: RwLock<HashMap<(String, Symbol), Holding>>,
    transactions: RwLock<Vec<Transaction>>,
    watchlists: RwLock<HashMap<String, Watchlist>>,
}

impl MemoryStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 거래 기록 수.
    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn holdings_for_user(&self, user_id: &str) -> Result<Vec<Holding>, StoreError> {
        let holdings = self.holdings.read().await;
        let mut result: Vec<Holding> = holdings
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, holding)| holding.clone())
            .collect();
        // 순회 순서를 안정적으로
        result.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(result)
    }

    async fn holding(
        &self,
        user_id: &str,
        symbol: &Symbol,
    ) -> Result<Option<Holding>, StoreError> {
        let holdings = self.holdings.read().await;
        Ok(holdings
            .get(&(user_id.to_string(), symbol.clone()))
            .cloned())
    }

    async fn upsert_holding(&self, holding: Holding) -> Result<(), StoreError> {
        let mut holdings = self.holdings.write().await;
        holdings.insert(
            (holding.user_id.clone(), holding.symbol.clone()),
            holding,
        );
        Ok(())
    }

    async fn delete_holding(&self, user_id: &str, symbol: &Symbol) -> Result<(), StoreError> {
        let mut holdings = self.holdings.write().await;
        holdings.remove(&(user_id.to_string(), symbol.clone()));
        Ok(())
    }

    async fn record_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        self.transactions.write().await.push(transaction);
        Ok(())
    }

    async fn watchlist(&self, user_id: &str) -> Result<Option<Watchlist>, StoreError> {
        Ok(self.watchlists.read().await.get(user_id).cloned())
    }

    async fn replace_watchlist(&self, watchlist: Watchlist) -> Result<(), StoreError> {
        self.watchlists
            .write()
            .await
            .insert(watchlist.user_id.clone(), watchlist);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockwatch_core::TransactionKind;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_holding_round_trip() {
        let store = MemoryStore::new();
        let holding = Holding::open("user-1", symbol("AAPL"), 10, dec!(100));

        store.upsert_holding(holding).await.unwrap();

        let loaded = store.holding("user-1", &symbol("AAPL")).await.unwrap();
        assert_eq!(loaded.unwrap().shares, 10);

        // 다른 사용자에게는 보이지 않음
        assert!(store
            .holding("user-2", &symbol("AAPL"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_holdings_for_user_sorted() {
        let store = MemoryStore::new();
        store
            .upsert_holding(Holding::open("user-1", symbol("MSFT"), 1, dec!(400)))
            .await
            .unwrap();
        store
            .upsert_holding(Holding::open("user-1", symbol("AAPL"), 2, dec!(200)))
            .await
            .unwrap();

        let holdings = store.holdings_for_user("user-1").await.unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol.as_str(), "AAPL");
        assert_eq!(holdings[1].symbol.as_str(), "MSFT");
    }

    #[tokio::test]
    async fn test_delete_holding() {
        let store = MemoryStore::new();
        store
            .upsert_holding(Holding::open("user-1", symbol("AAPL"), 10, dec!(100)))
            .await
            .unwrap();

        store.delete_holding("user-1", &symbol("AAPL")).await.unwrap();

        assert!(store
            .holding("user-1", &symbol("AAPL"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_record_transaction() {
        let store = MemoryStore::new();
        let tx = Transaction::new("user-1", symbol("AAPL"), TransactionKind::Buy, 10, dec!(100));

        store.record_transaction(tx).await.unwrap();
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_watchlist_replace() {
        let store = MemoryStore::new();
        assert!(store.watchlist("user-1").await.unwrap().is_none());

        let watchlist = Watchlist::new("user-1", vec![symbol("AAPL"), symbol("MSFT")]);
        store.replace_watchlist(watchlist).await.unwrap();

        let loaded = store.watchlist("user-1").await.unwrap().unwrap();
        assert_eq!(loaded.symbols.len(), 2);

        // 교체는 덮어쓰기
        store
            .replace_watchlist(Watchlist::new("user-1", vec![symbol("TSLA")]))
            .await
            .unwrap();
        let loaded = store.watchlist("user-1").await.unwrap().unwrap();
        assert_eq!(loaded.symbols.len(), 1);
        assert_eq!(loaded.symbols[0].as_str(), "TSLA");
    }
}
