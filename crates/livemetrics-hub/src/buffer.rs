//! 고정 용량 버퍼.
//!
//! - [`EventLog`]: 최신 이벤트가 앞. 넘치면 가장 오래된(뒤) 것을 버린다.
//! - [`TimeSeries`]: 시간순(오래된 것이 앞). 넘치면 가장 오래된(앞) 것을 버린다.

use livemetrics_core::models::aggregate::MetricsTimeSeriesPoint;
use livemetrics_core::models::event::RealtimeEvent;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::VecDeque;

/// 활동 이벤트 로그 (최신 우선)
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    entries: RwLock<VecDeque<RealtimeEvent>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// 맨 앞에 추가하고, 용량을 넘으면 뒤에서 제거
    pub fn append(&self, event: RealtimeEvent) {
        let mut entries = self.entries.write();
        entries.push_front(event);
        entries.truncate(self.capacity);
    }

    /// 최신 순으로 최대 `limit`개
    pub fn recent(&self, limit: usize) -> Vec<RealtimeEvent> {
        self.entries.read().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, VecDeque<RealtimeEvent>> {
        self.entries.write()
    }
}

/// 집계 시계열 (시간순)
#[derive(Debug)]
pub struct TimeSeries {
    capacity: usize,
    points: RwLock<VecDeque<MetricsTimeSeriesPoint>>,
}

impl TimeSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// 뒤에 추가하고, 용량을 넘으면 앞에서 제거
    pub fn push(&self, point: MetricsTimeSeriesPoint) {
        let mut points = self.points.write();
        points.push_back(point);
        while points.len() > self.capacity {
            points.pop_front();
        }
    }

    /// 오래된 순 전체 복사본
    pub fn points(&self) -> Vec<MetricsTimeSeriesPoint> {
        self.points.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, VecDeque<MetricsTimeSeriesPoint>> {
        self.points.write()
    }
}
