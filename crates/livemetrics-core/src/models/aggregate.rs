//! 집계 결과 모델.
//!
//! 모두 저장소에서 매번 재계산되는 파생 값이며 영속화하지 않는다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 기능별 사용 횟수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCount {
    pub feature: String,
    pub count: u64,
}

/// 시간대(0-23시)별 레코드 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

/// 전체 사용자 집계 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregatedMetrics {
    pub total_users: usize,
    pub active_users: usize,
    /// 활성 사용자만의 평균 세션 시간 (분)
    pub avg_session_duration: f64,
    pub total_page_views: u64,
    pub total_events: u64,
    /// 사용 횟수 상위 5개 기능
    pub top_features: Vec<FeatureCount>,
    /// 레코드 수 상위 5개 시간대
    pub peak_hours: Vec<HourCount>,
}

/// 집계 틱마다 하나씩 추가되는 시계열 포인트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub active_users: usize,
    pub total_events: u64,
    pub avg_engagement: f64,
}

/// 기능 사용 추세
///
/// 과거 기준선을 추적하지 않으므로 현재는 항상 `Stable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Stable,
}

/// 기능별 사용 통계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUsageMetric {
    pub feature: String,
    pub usage_count: u64,
    pub unique_users: u64,
    /// 평균 사용 시간 (분, totalTime / usageCount)
    pub avg_duration: f64,
    #[serde(default)]
    pub trend: Trend,
}
