//! 대시보드 조회 응답 모델.
//!
//! `GET /api/metrics/current` 응답. 수집 서버가 직렬화하고
//! 원격 대시보드 폴러가 역직렬화한다.

use serde::{Deserialize, Serialize};

use super::aggregate::{AggregatedMetrics, FeatureUsageMetric, MetricsTimeSeriesPoint};
use super::event::RealtimeEvent;
use super::metric::UserMetric;

/// 허브 현재 상태 전체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSnapshot {
    pub success: bool,
    pub user_metrics: Vec<UserMetric>,
    pub aggregated_metrics: AggregatedMetrics,
    pub time_series_data: Vec<MetricsTimeSeriesPoint>,
    pub recent_events: Vec<RealtimeEvent>,
    pub feature_usage: Vec<FeatureUsageMetric>,
}
