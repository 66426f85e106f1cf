//! 번역 결과 캐시
//!
//! 핑거프린트 → 결과. 명시적 무효화는 없으며 용량을 넘으면 가장 먼저
//! 들어온 항목부터 제거합니다.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use udfbridge_core::udf::TranslationResult;

use crate::fingerprint::Fingerprint;

/// 용량 제한 결과 캐시
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, TranslationResult>,
    order: VecDeque<Fingerprint>,
}

impl ResultCache {
    /// `capacity`는 최소 1로 보정됩니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<TranslationResult> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key).cloned()
    }

    /// 결과를 저장합니다. 같은 키가 있으면 덮어쓰고 순서는 유지합니다.
    pub fn insert(&self, key: Fingerprint, result: TranslationResult) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.entries.insert(key, result).is_some() {
            return;
        }
        inner.order.push_back(key);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
