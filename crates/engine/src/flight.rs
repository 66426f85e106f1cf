//! 단일 실행(single-flight) 중복 제거
//!
//! 같은 키로 동시에 들어온 요청 중 첫 번째만 작업을 수행(리더)하고, 나머지는
//! 리더의 결과를 기다립니다(팔로워). 결과는 `watch` 채널로 전달됩니다.
//!
//! 리더가 결과를 발행하지 못하고 사라지면(취소, 패닉) 가드의 `Drop`이 항목을
//! 제거하고 채널을 닫아 팔로워가 무한히 대기하지 않게 합니다.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

/// 키 단위 single-flight 그룹
#[derive(Debug)]
pub struct SingleFlight<K, V> {
    inflight: Mutex<HashMap<K, watch::Receiver<Option<V>>>>,
}

/// [`SingleFlight::join`] 결과
pub enum Flight<'a, K: Eq + Hash + Clone, V: Clone> {
    /// 작업을 수행하고 결과를 발행해야 함
    Leader(FlightLeader<'a, K, V>),
    /// 리더의 결과를 기다림
    Follower(FlightFollower<V>),
}

impl<K: Eq + Hash + Clone, V: Clone> SingleFlight<K, V> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// 키에 참여합니다. 진행 중인 리더가 없으면 호출자가 리더가 됩니다.
    pub fn join(&self, key: K) -> Flight<'_, K, V> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(rx) = inflight.get(&key) {
            return Flight::Follower(FlightFollower { rx: rx.clone() });
        }
        let (tx, rx) = watch::channel(None);
        inflight.insert(key.clone(), rx);
        Flight::Leader(FlightLeader {
            group: self,
            key,
            tx,
            published: false,
        })
    }

    /// 진행 중인 키 개수
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn forget(&self, key: &K) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// 리더 가드
pub struct FlightLeader<'a, K: Eq + Hash + Clone, V: Clone> {
    group: &'a SingleFlight<K, V>,
    key: K,
    tx: watch::Sender<Option<V>>,
    published: bool,
}

impl<K: Eq + Hash + Clone, V: Clone> FlightLeader<'_, K, V> {
    /// 결과를 발행하고 키를 해제합니다.
    ///
    /// 해제 후에 들어온 요청은 새 리더가 되므로, 재사용할 결과는 발행 전에
    /// 캐시에 넣어 두어야 합니다.
    pub fn publish(mut self, value: V) {
        self.group.forget(&self.key);
        self.tx.send_replace(Some(value));
        self.published = true;
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Drop for FlightLeader<'_, K, V> {
    fn drop(&mut self) {
        if !self.published {
            self.group.forget(&self.key);
        }
    }
}

/// 팔로워 대기 핸들
pub struct FlightFollower<V> {
    rx: watch::Receiver<Option<V>>,
}

impl<V: Clone> FlightFollower<V> {
    /// 리더의 결과를 기다립니다.
    ///
    /// 리더가 발행 없이 사라지면 `None`을 반환합니다.
    pub async fn wait(mut self) -> Option<V> {
        self.rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| Option::clone(&value))
    }
}
