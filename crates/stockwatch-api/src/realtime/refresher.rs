//! 주기적 가격 리프레시 루프.
//!
//! 구독된 심볼이 하나라도 생기면 시작되어 프로세스 수명 동안
//! 고정 주기로 동작하는 백그라운드 태스크. 사이클마다 구독 심볼
//! 스냅샷을 떠서 시세 소스에서 최신 가격을 가져오고, 결과 배치를
//! 레지스트리로 브로드캐스트합니다.
//!
//! 시작은 이벤트 기반([`RefresherHandle::start_if_idle`]), 정지는
//! 명시적인 shutdown 토큰으로만 일어납니다. 구독이 전부 사라져도
//! 루프는 멈추지 않고 빈 사이클을 no-op으로 넘깁니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use stockwatch_core::{PriceUpdate, RealtimeConfig, Symbol};
use stockwatch_data::{cycle_change, HistoryRange, Interval, SharedQuoteProvider};

use super::registry::SharedRegistry;
use crate::metrics::{record_price_broadcast, record_quote_fetch, set_active_symbols};

/// 한 사이클의 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 구독된 심볼 없음
    Idle,
    /// 업데이트 배치 전달 (심볼 수)
    Delivered(usize),
    /// 모든 심볼 조회 실패 (실패 수) - 소스 장애로 간주하고 백오프
    AllFailed(usize),
}

/// 주기적 가격 리프레셔.
pub struct PriceRefresher {
    registry: SharedRegistry,
    quotes: SharedQuoteProvider,
    config: RealtimeConfig,
}

impl PriceRefresher {
    /// 새 리프레셔 생성.
    pub fn new(
        registry: SharedRegistry,
        quotes: SharedQuoteProvider,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            registry,
            quotes,
            config,
        }
    }

    /// 리프레시 루프 실행.
    ///
    /// 사이클 직후 주기만큼 대기합니다. 전 심볼 조회 실패 사이클
    /// 뒤에는 더 긴 백오프 주기를 적용합니다. shutdown 토큰이
    /// 취소되면 협조적으로 종료합니다.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.refresh_interval_secs,
            "Price refresher started"
        );

        loop {
            let outcome = self.run_cycle().await;

            let delay = match outcome {
                CycleOutcome::AllFailed(failures) => {
                    error!(failures, "Refresh cycle failed for every symbol, backing off");
                    self.config.error_backoff()
                }
                _ => self.config.refresh_interval(),
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    info!("Price refresher stopped");
                    break;
                }
            }
        }
    }

    /// 한 사이클 수행.
    ///
    /// 심볼 집합 스냅샷 → 심볼별 조회(타임아웃 적용) → 배치
    /// 브로드캐스트. 심볼 하나의 실패는 로그만 남기고 건너뜁니다.
    async fn run_cycle(&self) -> CycleOutcome {
        // 스냅샷 직후 락 해제. 사이클 중간에 추가된 심볼은 다음
        // 사이클부터 반영된다.
        let symbols = self.registry.active_symbols().await;
        set_active_symbols(symbols.len());

        if symbols.is_empty() {
            return CycleOutcome::Idle;
        }

        debug!(count = symbols.len(), "Refreshing prices");

        let mut updates: HashMap<Symbol, PriceUpdate> = HashMap::new();
        let mut failures = 0usize;

        for symbol in &symbols {
            let fetch = self
                .quotes
                .history(symbol, HistoryRange::OneDay, Interval::OneMinute);

            match tokio::time::timeout(self.config.fetch_timeout(), fetch).await {
                Ok(Ok(candles)) => match cycle_change(&candles) {
                    Some((price, change, change_percent)) => {
                        record_quote_fetch("ok");
                        updates.insert(
                            symbol.clone(),
                            PriceUpdate {
                                symbol: symbol.clone(),
                                price,
                                change,
                                change_percent,
                                timestamp: chrono::Utc::now(),
                            },
                        );
                    }
                    None => {
                        record_quote_fetch("empty");
                        warn!(symbol = %symbol, "Empty history from quote source");
                        failures += 1;
                    }
                },
                Ok(Err(e)) => {
                    record_quote_fetch("error");
                    warn!(symbol = %symbol, error = %e, "Price refresh failed");
                    failures += 1;
                }
                Err(_) => {
                    record_quote_fetch("timeout");
                    warn!(
                        symbol = %symbol,
                        timeout_secs = self.config.fetch_timeout_secs,
                        "Price fetch timed out"
                    );
                    failures += 1;
                }
            }
        }

        if updates.is_empty() {
            return CycleOutcome::AllFailed(failures);
        }

        let count = updates.len();
        let receivers = self.registry.broadcast(updates);
        record_price_broadcast(count);
        debug!(symbols = count, receivers, "Broadcasted price updates");

        CycleOutcome::Delivered(count)
    }
}

/// 리프레셔 수명주기 핸들.
///
/// 첫 구독 성공 시 한 번만 태스크를 띄우고, 이후의 시작 요청은
/// no-op입니다. 정지는 shutdown 토큰 취소로만 가능합니다.
pub struct RefresherHandle {
    registry: SharedRegistry,
    quotes: SharedQuoteProvider,
    config: RealtimeConfig,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl RefresherHandle {
    /// 새 핸들 생성. 태스크는 아직 시작되지 않습니다.
    pub fn new(
        registry: SharedRegistry,
        quotes: SharedQuoteProvider,
        config: RealtimeConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            quotes,
            config,
            shutdown,
            started: AtomicBool::new(false),
        }
    }

    /// 아직 시작되지 않았으면 리프레시 루프 시작.
    ///
    /// # Returns
    ///
    /// 이 호출로 태스크가 시작되었으면 `true`
    pub fn start_if_idle(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let refresher = PriceRefresher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.quotes),
            self.config.clone(),
        );
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            refresher.run(shutdown).await;
        });

        true
    }

    /// 루프가 시작된 적이 있는지 확인.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// 협조적 정지 요청.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
