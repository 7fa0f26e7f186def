//! 도메인 모델.
//!
//! 실시간 가격 업데이트, 포트폴리오 보유 종목, 거래 기록, 관심종목 타입 정의.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::symbol::Symbol;

/// 실시간 가격 업데이트.
///
/// 리프레시 사이클마다 새로 계산되어 브로드캐스트됩니다. 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    /// 심볼
    pub symbol: Symbol,
    /// 현재가 (마지막 종가)
    pub price: Decimal,
    /// 절대 변화량 (마지막 종가 - 첫 종가)
    pub change: Decimal,
    /// 변화율 (%)
    pub change_percent: Decimal,
    /// 계산 시각
    pub timestamp: DateTime<Utc>,
}

/// 거래 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl TransactionKind {
    /// 와이어 표현 ("buy" | "sell").
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 포트폴리오 거래 기록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// 거래 ID
    pub id: Uuid,
    /// 사용자 ID
    pub user_id: String,
    /// 심볼
    pub symbol: Symbol,
    /// 거래 유형
    pub kind: TransactionKind,
    /// 주식 수
    pub shares: u64,
    /// 주당 가격
    pub price: Decimal,
    /// 총 거래 금액
    pub total_value: Decimal,
    /// 거래 시각
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// 새 거래 기록 생성.
    pub fn new(
        user_id: impl Into<String>,
        symbol: Symbol,
        kind: TransactionKind,
        shares: u64,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            symbol,
            kind,
            shares,
            price,
            total_value: price * Decimal::from(shares),
            timestamp: Utc::now(),
        }
    }
}

/// 거래 적용 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("cannot sell {requested} shares, only own {owned}")]
    OverSell { owned: u64, requested: u64 },
    #[error("shares must be greater than zero")]
    ZeroShares,
}

/// 매도 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellOutcome {
    /// 일부 매도, 보유 유지
    Reduced,
    /// 전량 매도, 보유 삭제 대상
    Closed,
}

/// 포트폴리오 보유 종목.
///
/// 매수는 가중 평균 단가로 합산되고, 매도는 평균 단가 기준으로
/// 투자 원금을 비례 차감합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    /// 사용자 ID
    pub user_id: String,
    /// 심볼
    pub symbol: Symbol,
    /// 보유 주식 수
    pub shares: u64,
    /// 평균 매수 단가
    pub average_price: Decimal,
    /// 총 투자 금액
    pub total_invested: Decimal,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 수정 시각
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// 첫 매수로 새 보유 종목 생성.
    pub fn open(
        user_id: impl Into<String>,
        symbol: Symbol,
        shares: u64,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        let invested = price * Decimal::from(shares);
        Self {
            user_id: user_id.into(),
            symbol,
            shares,
            average_price: price,
            total_invested: invested,
            created_at: now,
            updated_at: now,
        }
    }

    /// 매수 적용 (가중 평균 단가).
    pub fn apply_buy(&mut self, shares: u64, price: Decimal) -> Result<(), TradeError> {
        if shares == 0 {
            return Err(TradeError::ZeroShares);
        }
        self.total_invested += price * Decimal::from(shares);
        self.shares += shares;
        self.average_price = self.total_invested / Decimal::from(self.shares);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 매도 적용.
    ///
    /// 투자 원금은 평균 단가 기준으로 비례 차감됩니다.
    /// 전량 매도 시 [`SellOutcome::Closed`]를 반환하며, 호출자는 보유 기록을
    /// 삭제해야 합니다.
    ///
    /// # Errors
    ///
    /// 보유 수량보다 많이 매도하려 하면 [`TradeError::OverSell`] 반환.
    pub fn apply_sell(&mut self, shares: u64) -> Result<SellOutcome, TradeError> {
        if shares == 0 {
            return Err(TradeError::ZeroShares);
        }
        if shares > self.shares {
            return Err(TradeError::OverSell {
                owned: self.shares,
                requested: shares,
            });
        }
        self.total_invested -= self.average_price * Decimal::from(shares);
        self.shares -= shares;
        self.updated_at = Utc::now();
        if self.shares == 0 {
            Ok(SellOutcome::Closed)
        } else {
            Ok(SellOutcome::Reduced)
        }
    }
}

/// 사용자 관심종목 목록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    /// 사용자 ID
    pub user_id: String,
    /// 심볼 목록
    pub symbols: Vec<Symbol>,
    /// 수정 시각
    pub updated_at: DateTime<Utc>,
}

impl Watchlist {
    /// 새 관심종목 목록 생성.
    pub fn new(user_id: impl Into<String>, symbols: Vec<Symbol>) -> Self {
        Self {
            user_id: user_id.into(),
            symbols,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_open_holding() {
        let holding = Holding::open("user-1", symbol("AAPL"), 10, dec!(100));
        assert_eq!(holding.shares, 10);
        assert_eq!(holding.average_price, dec!(100));
        assert_eq!(holding.total_invested, dec!(1000));
    }

    #[test]
    fn test_buy_weighted_average() {
        let mut holding = Holding::open("user-1", symbol("AAPL"), 10, dec!(100));
        holding.apply_buy(10, dec!(200)).unwrap();

        assert_eq!(holding.shares, 20);
        assert_eq!(holding.total_invested, dec!(3000));
        assert_eq!(holding.average_price, dec!(150));
    }

    #[test]
    fn test_sell_reduces_cost_pro_rata() {
        let mut holding = Holding::open("user-1", symbol("AAPL"), 10, dec!(100));
        let outcome = holding.apply_sell(4).unwrap();

        assert_eq!(outcome, SellOutcome::Reduced);
        assert_eq!(holding.shares, 6);
        assert_eq!(holding.total_invested, dec!(600));
        assert_eq!(holding.average_price, dec!(100));
    }

    #[test]
    fn test_sell_to_zero_closes_holding() {
        // 10주를 100에 사고 10주를 팔면 보유가 사라져야 함 (매도가는 무관)
        let mut holding = Holding::open("user-1", symbol("AAPL"), 10, dec!(100));
        let outcome = holding.apply_sell(10).unwrap();

        assert_eq!(outcome, SellOutcome::Closed);
        assert_eq!(holding.shares, 0);
        assert_eq!(holding.total_invested, dec!(0));
    }

    #[test]
    fn test_over_sell_rejected() {
        let mut holding = Holding::open("user-1", symbol("AAPL"), 5, dec!(100));
        let err = holding.apply_sell(6).unwrap_err();

        assert_eq!(
            err,
            TradeError::OverSell {
                owned: 5,
                requested: 6
            }
        );
        // 실패한 매도는 상태를 바꾸지 않음
        assert_eq!(holding.shares, 5);
    }

    #[test]
    fn test_transaction_total_value() {
        let tx = Transaction::new("user-1", symbol("MSFT"), TransactionKind::Buy, 3, dec!(250.50));
        assert_eq!(tx.total_value, dec!(751.50));
    }

    #[test]
    fn test_price_update_serializes_camel_case() {
        let update = PriceUpdate {
            symbol: symbol("AAPL"),
            price: dec!(105),
            change: dec!(5),
            change_percent: dec!(5),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("changePercent"));
        assert!(!json.contains("change_percent"));
    }
}
