//! 플랫폼 쌍별 회로 차단기
//!
//! # 상태 전이
//!
//! ```text
//! Closed ──(윈도 내 요청 ≥ min_requests, 실패율 ≥ failure_ratio)──> Open
//! Open ──(cooldown 경과)──> HalfOpen
//! HalfOpen ──(탐침 성공)──> Closed
//! HalfOpen ──(탐침 실패)──> Open
//! ```
//!
//! 시간은 `tokio::time::Instant`로 측정하므로 테스트에서 시계를 멈추고
//! 진행시킬 수 있습니다.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use udfbridge_core::config::CircuitBreakerConfig;
use udfbridge_core::error::TranslationError;
use udfbridge_core::metrics as m;

/// 반열림 상태에서 탐침 슬롯이 모두 찬 경우 안내할 재시도 대기
const HALF_OPEN_RETRY_MS: u64 = 1_000;

/// 회로 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    /// `udfbridge_circuit_state` 게이지 값
    pub fn gauge_value(&self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::HalfOpen => f.write_str("half_open"),
            Self::Open => f.write_str("open"),
        }
    }
}

/// 헬스 보고용 회로 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub pair: String,
    pub state: CircuitState,
    /// 현재 윈도 내 요청 수
    pub window_requests: usize,
    /// 현재 윈도 내 실패 수
    pub window_failures: usize,
    /// 열림 상태일 때 남은 쿨다운 (밀리초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    /// (기록 시각, 성공 여부)
    outcomes: VecDeque<(Instant, bool)>,
    open_until: Option<Instant>,
    trials_in_flight: u32,
}

impl Breaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            outcomes: VecDeque::new(),
            open_until: None,
            trials_in_flight: 0,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some((at, _)) = self.outcomes.front() {
            if now.duration_since(*at) > window {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, ok)| !ok).count()
    }
}

/// 회로 차단기 묶음 (플랫폼 쌍 → 차단기)
#[derive(Debug)]
pub struct CircuitBreakers {
    settings: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Breaker>>,
}

impl CircuitBreakers {
    pub fn new(settings: CircuitBreakerConfig) -> Self {
        Self {
            settings,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// 플랫폼 쌍 키 (`source->target`)
    pub fn pair_key(source: &str, target: &str) -> String {
        format!("{source}->{target}")
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.settings.window_secs)
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.settings.cooldown_secs)
    }

    /// 요청 진입을 허가합니다.
    ///
    /// 열림 상태이거나 반열림 탐침 슬롯이 모두 차 있으면 `CircuitOpen`을 반환합니다.
    pub fn admit(&self, pair: &str) -> Result<CircuitPermit<'_>, TranslationError> {
        let now = Instant::now();
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let breaker = breakers.entry(pair.to_owned()).or_insert_with(Breaker::new);

        if breaker.state == CircuitState::Open {
            match breaker.open_until {
                Some(until) if now < until => {
                    let remaining = until.duration_since(now).as_millis();
                    return Err(TranslationError::CircuitOpen {
                        pair: pair.to_owned(),
                        retry_after_ms: u64::try_from(remaining).unwrap_or(u64::MAX).max(1),
                    });
                }
                _ => {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.open_until = None;
                    breaker.trials_in_flight = 0;
                    publish_state(pair, CircuitState::HalfOpen);
                    info!(pair, "circuit half-open, admitting trial requests");
                }
            }
        }

        let trial = breaker.state == CircuitState::HalfOpen;
        if trial {
            if breaker.trials_in_flight >= self.settings.half_open_max_requests {
                return Err(TranslationError::CircuitOpen {
                    pair: pair.to_owned(),
                    retry_after_ms: HALF_OPEN_RETRY_MS,
                });
            }
            breaker.trials_in_flight += 1;
        }

        Ok(CircuitPermit {
            breakers: self,
            pair: pair.to_owned(),
            trial,
            recorded: false,
        })
    }

    fn record(&self, pair: &str, trial: bool, success: bool) {
        let now = Instant::now();
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(breaker) = breakers.get_mut(pair) else {
            return;
        };

        if trial {
            breaker.trials_in_flight = breaker.trials_in_flight.saturating_sub(1);
            if breaker.state != CircuitState::HalfOpen {
                return;
            }
            if success {
                breaker.state = CircuitState::Closed;
                breaker.outcomes.clear();
                publish_state(pair, CircuitState::Closed);
                info!(pair, "circuit closed after successful trial");
            } else {
                self.trip(pair, breaker, now);
            }
            return;
        }

        if breaker.state != CircuitState::Closed {
            return;
        }
        breaker.outcomes.push_back((now, success));
        breaker.prune(now, self.window());

        let requests = breaker.outcomes.len();
        let failures = breaker.failures();
        if requests >= self.settings.min_requests as usize
            && failures as f64 / requests as f64 >= self.settings.failure_ratio
        {
            self.trip(pair, breaker, now);
        }
    }

    fn trip(&self, pair: &str, breaker: &mut Breaker, now: Instant) {
        let requests = breaker.outcomes.len();
        let failures = breaker.failures();
        breaker.state = CircuitState::Open;
        breaker.open_until = Some(now + self.cooldown());
        breaker.outcomes.clear();
        publish_state(pair, CircuitState::Open);
        warn!(
            pair,
            requests,
            failures,
            cooldown_secs = self.settings.cooldown_secs,
            "circuit opened"
        );
    }

    fn release_trial(&self, pair: &str) {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(breaker) = breakers.get_mut(pair) {
            breaker.trials_in_flight = breaker.trials_in_flight.saturating_sub(1);
        }
    }

    /// 플랫폼 쌍 하나의 현재 상태
    pub fn state(&self, pair: &str) -> CircuitState {
        self.breakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pair)
            .map_or(CircuitState::Closed, |b| b.state)
    }

    /// 모든 회로의 스냅샷 (쌍 이름 순)
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let now = Instant::now();
        let window = self.window();
        let breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots: Vec<CircuitSnapshot> = breakers
            .iter()
            .map(|(pair, breaker)| {
                let live: Vec<bool> = breaker
                    .outcomes
                    .iter()
                    .filter(|(at, _)| now.duration_since(*at) <= window)
                    .map(|(_, ok)| *ok)
                    .collect();
                CircuitSnapshot {
                    pair: pair.clone(),
                    state: breaker.state,
                    window_requests: live.len(),
                    window_failures: live.iter().filter(|ok| !**ok).count(),
                    retry_after_ms: breaker.open_until.map(|until| {
                        u64::try_from(until.saturating_duration_since(now).as_millis())
                            .unwrap_or(u64::MAX)
                    }),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.pair.cmp(&b.pair));
        snapshots
    }

    /// 열림 상태인 쌍 목록
    pub fn open_pairs(&self) -> Vec<String> {
        self.snapshots()
            .into_iter()
            .filter(|s| s.state == CircuitState::Open)
            .map(|s| s.pair)
            .collect()
    }
}

fn publish_state(pair: &str, state: CircuitState) {
    metrics::gauge!(m::CIRCUIT_STATE, m::LABEL_PAIR => pair.to_owned()).set(state.gauge_value());
}

/// 진입 허가
///
/// 결과를 [`CircuitPermit::record`]로 보고합니다. 보고 없이 버려진 탐침 허가는
/// 슬롯만 반환하고 결과로 세지 않습니다.
pub struct CircuitPermit<'a> {
    breakers: &'a CircuitBreakers,
    pair: String,
    trial: bool,
    recorded: bool,
}

impl CircuitPermit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record(mut self, success: bool) {
        self.recorded = true;
        self.breakers.record(&self.pair, self.trial, success);
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.recorded {
            self.breakers.release_trial(&self.pair);
        }
    }
}
