//! 종목 심볼 타입.
//!
//! 주식/지수 식별자를 검증된 상태로만 다루기 위한 newtype.
//! 레지스트리나 캐시 키에 들어가기 전에 반드시 문법 검증을 통과해야 합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 심볼 최대 길이.
pub const MAX_SYMBOL_LEN: usize = 10;

/// 심볼 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("empty symbol")]
    Empty,
    #[error("symbol too long: {0} (max {MAX_SYMBOL_LEN})")]
    TooLong(usize),
    #[error("invalid character in symbol: {0:?}")]
    InvalidCharacter(char),
}

/// 검증된 종목 심볼.
///
/// 허용 문법: 대문자 알파벳과 지수 접두어 `^`, 1~10자 (`^[A-Z^]{1,10}$`).
/// `Symbol` 값은 항상 이 문법을 만족합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// 문자열을 검증하여 심볼 생성.
    ///
    /// # Errors
    ///
    /// 빈 문자열, 10자 초과, 허용되지 않는 문자가 있으면 [`SymbolError`] 반환.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        if raw.is_empty() {
            return Err(SymbolError::Empty);
        }
        if raw.len() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(raw.len()));
        }
        if let Some(c) = raw.chars().find(|c| !matches!(c, 'A'..='Z' | '^')) {
            return Err(SymbolError::InvalidCharacter(c));
        }
        Ok(Self(raw.to_string()))
    }

    /// 문자열 슬라이스 반환.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 지수 심볼 여부 (`^` 접두어).
    pub fn is_index(&self) -> bool {
        self.0.starts_with('^')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_symbols() {
        assert_eq!(Symbol::parse("AAPL").unwrap().as_str(), "AAPL");
        assert_eq!(Symbol::parse("^GSPC").unwrap().as_str(), "^GSPC");
        assert_eq!(Symbol::parse("A").unwrap().as_str(), "A");
        assert_eq!(Symbol::parse("ABCDEFGHIJ").unwrap().as_str(), "ABCDEFGHIJ");
    }

    #[test]
    fn test_rejects_lowercase() {
        assert_eq!(
            Symbol::parse("aapl"),
            Err(SymbolError::InvalidCharacter('a'))
        );
    }

    #[test]
    fn test_rejects_empty_and_too_long() {
        assert_eq!(Symbol::parse(""), Err(SymbolError::Empty));
        assert_eq!(
            Symbol::parse("ABCDEFGHIJK"),
            Err(SymbolError::TooLong(11))
        );
    }

    #[test]
    fn test_rejects_digits_and_punctuation() {
        assert!(Symbol::parse("BRK.B").is_err());
        assert!(Symbol::parse("005930").is_err());
        assert!(Symbol::parse("AAPL ").is_err());
    }

    #[test]
    fn test_is_index() {
        assert!(Symbol::parse("^DJI").unwrap().is_index());
        assert!(!Symbol::parse("MSFT").unwrap().is_index());
    }

    #[test]
    fn test_serde_round_trip() {
        let symbol: Symbol = serde_json::from_str(r#""TSLA""#).unwrap();
        assert_eq!(symbol.as_str(), "TSLA");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), r#""TSLA""#);

        // 역직렬화도 문법 검증을 거침
        assert!(serde_json::from_str::<Symbol>(r#""tsla""#).is_err());
    }
}
