//! 엔진 처리 통계
//!
//! 메트릭 레코더가 설치되지 않아도 `total_operations`, `success_rate`,
//! `avg_latency_ms`를 조회할 수 있도록 원자적 카운터로 집계합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// 원자적 처리 카운터
#[derive(Debug, Default)]
pub struct EngineStats {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    latency_micros: AtomicU64,
    cache_hits: AtomicU64,
    dedup_shared: AtomicU64,
}

/// 통계 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_operations: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// 성공 비율 (요청이 없으면 0)
    pub success_rate: f64,
    /// 평균 처리 시간 (밀리초)
    pub avg_latency_ms: f64,
    pub cache_hits: u64,
    pub dedup_shared: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 번역 한 건의 결과를 기록합니다.
    pub fn record(&self, success: bool, elapsed: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dedup_shared(&self) {
        self.dedup_shared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let success = self.success.load(Ordering::Relaxed);
        let failure = self.failure.load(Ordering::Relaxed);
        let latency_micros = self.latency_micros.load(Ordering::Relaxed);
        let (success_rate, avg_latency_ms) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                success as f64 / total as f64,
                latency_micros as f64 / total as f64 / 1_000.0,
            )
        };
        StatsSnapshot {
            total_operations: total,
            success_count: success,
            failure_count: failure,
            success_rate,
            avg_latency_ms,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            dedup_shared: self.dedup_shared.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn empty_stats_are_zero() {
        let snapshot = EngineStats::new().snapshot();
        assert_eq!(snapshot.total_operations, 0);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.avg_latency_ms, 0.0);
    }

    #[test]
    fn rate_and_latency() {
        let stats = EngineStats::new();
        stats.record(true, Duration::from_millis(10));
        stats.record(true, Duration::from_millis(20));
        stats.record(false, Duration::from_millis(30));
        stats.record_cache_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_operations, 3);
        assert_eq!(snapshot.success_count, 2);
        assert_eq!(snapshot.failure_count, 1);
        assert!((snapshot.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((snapshot.avg_latency_ms - 20.0).abs() < 1e-9);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let stats = Arc::new(EngineStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        stats.record(true, Duration::from_micros(1));
                        stats.record_dedup_shared();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker should not panic");
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_operations, 8_000);
        assert_eq!(snapshot.success_count, 8_000);
        assert_eq!(snapshot.dedup_shared, 8_000);
    }
}
