//! 변경 감지기.
//!
//! 원격 허브 조회 결과의 일부 필드만으로 지문을 만들어 직전 값과 비교한다.
//! 지문에 들어가지 않는 필드만 바뀐 응답은 변경 없음으로 처리된다.
//! 다음에 지문 필드가 바뀔 때 함께 반영된다.

use livemetrics_core::models::snapshot::DashboardSnapshot;

/// 조회 결과 지문
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub total_events: u64,
    pub total_users: usize,
    pub series_len: usize,
}

impl Fingerprint {
    pub fn of(snapshot: &DashboardSnapshot) -> Self {
        Self {
            total_events: snapshot.aggregated_metrics.total_events,
            total_users: snapshot.aggregated_metrics.total_users,
            series_len: snapshot.time_series_data.len(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<Fingerprint>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지문이 바뀌었으면 새 지문을 저장하고 true
    pub fn observe(&mut self, snapshot: &DashboardSnapshot) -> bool {
        let fingerprint = Fingerprint::of(snapshot);
        if self.last == Some(fingerprint) {
            return false;
        }
        self.last = Some(fingerprint);
        true
    }

    pub fn last(&self) -> Option<Fingerprint> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
