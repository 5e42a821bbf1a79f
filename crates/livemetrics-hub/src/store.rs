//! 메트릭 레코드 저장소.
//!
//! userId → 최신 `UserMetric`. 허브의 단일 진실 공급원.

use livemetrics_core::models::metric::UserMetric;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;

/// 사용자별 최신 메트릭 저장소
///
/// 키 순서는 계약이 아니지만, 내부적으로 userId 오름차순으로 순회하여
/// 집계의 동점 처리 결과가 실행마다 같도록 한다.
#[derive(Debug, Default)]
pub struct MetricStore {
    records: RwLock<BTreeMap<String, UserMetric>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 같은 userId의 기존 레코드를 통째로 대체
    pub fn upsert(&self, metric: UserMetric) {
        self.records.write().insert(metric.user_id.clone(), metric);
    }

    /// 여러 레코드를 하나의 쓰기 락 안에서 반영
    ///
    /// 읽는 쪽은 묶음 전체가 반영되기 전 또는 후의 상태만 본다.
    pub fn upsert_bulk(&self, metrics: Vec<UserMetric>) -> usize {
        let count = metrics.len();
        let mut records = self.records.write();
        for metric in metrics {
            records.insert(metric.user_id.clone(), metric);
        }
        count
    }

    /// 현재 레코드 전체의 복사본
    pub fn get_all(&self) -> Vec<UserMetric> {
        self.records.read().values().cloned().collect()
    }

    pub fn get(&self, user_id: &str) -> Option<UserMetric> {
        self.records.read().get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, UserMetric>> {
        self.records.write()
    }
}
