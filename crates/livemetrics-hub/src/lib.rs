//! # livemetrics-hub
//!
//! 라이브 메트릭 허브.
//! 사용자별 최신 메트릭을 인메모리로 보관하고, 주기적으로 집계하여
//! 시계열을 쌓고, 세 개의 독립 채널로 구독자에게 알린다.
//!
//! ## 구성
//! - [`store`]: userId → 최신 `UserMetric` (last-write-wins)
//! - [`buffer`]: 이벤트 로그(최신 우선)와 시계열(오래된 것 우선) 고정 용량 버퍼
//! - [`aggregator`]: 집계 계산과 주기 실행
//! - [`subscription`]: 채널별 구독/발행, 실패 리스너 격리
//! - [`gateway`]: `MetricSink` 구현 (정규화 → 저장 → 발행)
//! - [`service`]: 위 구성요소를 묶는 `LiveMetricsHub` (start/stop 라이프사이클)

pub mod aggregator;
pub mod buffer;
pub mod gateway;
pub mod service;
pub mod store;
pub mod subscription;

pub use gateway::IngestionGateway;
pub use service::LiveMetricsHub;
pub use subscription::{Channel, HubEvent, Subscription, SubscriptionHub};

use buffer::{EventLog, TimeSeries};
use store::MetricStore;

/// 허브의 공유 가변 상태
///
/// 저장소, 이벤트 로그, 시계열이 각자 락을 갖는다.
/// 동시에 여러 개를 잠글 때는 항상 store → events → series 순서.
#[derive(Debug)]
pub struct HubState {
    pub store: MetricStore,
    pub events: EventLog,
    pub series: TimeSeries,
}

impl HubState {
    /// 지정 용량으로 빈 상태 생성
    pub fn new(event_log_capacity: usize, time_series_capacity: usize) -> Self {
        Self {
            store: MetricStore::new(),
            events: EventLog::new(event_log_capacity),
            series: TimeSeries::new(time_series_capacity),
        }
    }

    /// 저장소, 이벤트 로그, 시계열을 한 번에 비운다
    ///
    /// 세 락을 모두 잡은 상태에서 비우므로 부분적으로 비워진 상태는 관측되지 않는다.
    pub fn reset(&self) {
        let mut records = self.store.write();
        let mut events = self.events.write();
        let mut series = self.series.write();
        records.clear();
        events.clear();
        series.clear();
    }
}
