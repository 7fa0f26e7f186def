//! 시세 소스 에러 타입.

use thiserror::Error;

/// 시세 조회 관련 에러.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// 네트워크/연결 에러
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 업스트림이 비정상 상태 코드 반환
    #[error("upstream returned status {0}")]
    Status(u16),

    /// 응답 파싱 실패
    #[error("parse error: {0}")]
    Parse(String),

    /// 해당 심볼 데이터 없음
    #[error("no data for symbol: {0}")]
    NoData(String),

    /// 조회 타임아웃
    #[error("fetch timed out")]
    Timeout,
}
