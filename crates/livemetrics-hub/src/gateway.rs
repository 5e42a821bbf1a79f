//! 수집 게이트웨이.
//!
//! 모든 수집 경로(HTTP, 폴링, 스트림)가 거치는 `MetricSink` 구현.
//! 정규화 → 저장 → 발행 순서로 처리하며, 발행은 저장 락을 놓은 뒤에 한다.

use livemetrics_core::error::CoreError;
use livemetrics_core::models::event::{RealtimeEvent, RealtimeEventType};
use livemetrics_core::models::metric::UserMetric;
use livemetrics_core::normalize::{normalize_bulk, normalize_metric};
use livemetrics_core::ports::ingest::MetricSink;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::subscription::{HubEvent, SubscriptionHub};
use crate::HubState;

/// 허브 상태에 대한 쓰기 입구
#[derive(Clone)]
pub struct IngestionGateway {
    state: Arc<HubState>,
    subscriptions: SubscriptionHub,
}

impl IngestionGateway {
    pub fn new(state: Arc<HubState>, subscriptions: SubscriptionHub) -> Self {
        Self {
            state,
            subscriptions,
        }
    }

    fn record_event(&self, event: RealtimeEvent) {
        self.state.events.append(event.clone());
        self.subscriptions.publish(HubEvent::Event(event));
    }
}

impl MetricSink for IngestionGateway {
    fn push_one(&self, raw: &Value) -> Result<UserMetric, CoreError> {
        let metric = normalize_metric(raw)?;
        self.state.store.upsert(metric.clone());
        debug!("메트릭 수신: {}", metric.user_id);

        self.subscriptions
            .publish(HubEvent::UserMetrics(vec![metric.clone()]));

        let event = RealtimeEvent::new(
            RealtimeEventType::FeatureUsed,
            metric.user_id.clone(),
            metric.user_name.clone(),
            json!({ "feature": metric.active_feature }),
        );
        self.record_event(event);

        Ok(metric)
    }

    fn push_bulk(&self, raws: &[Value]) -> Result<usize, CoreError> {
        let metrics = normalize_bulk(raws)?;
        if metrics.is_empty() {
            return Ok(0);
        }

        self.state.store.upsert_bulk(metrics.clone());
        let count = metrics.len();
        debug!("메트릭 일괄 수신: {}건", count);

        self.subscriptions.publish(HubEvent::UserMetrics(metrics));
        Ok(count)
    }

    fn publish_event(&self, event: RealtimeEvent) {
        debug!("이벤트 수신: {:?} ({})", event.event_type, event.user_id);
        self.record_event(event);
    }
}
