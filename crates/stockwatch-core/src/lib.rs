//! # Stockwatch Core
//!
//! 시장 데이터 집계 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 심볼 타입 및 검증 문법
//! - 가격 업데이트 / 보유 종목 / 거래 기록
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;
pub mod symbol;

pub use config::*;
pub use domain::*;
pub use logging::*;
pub use symbol::{Symbol, SymbolError};
