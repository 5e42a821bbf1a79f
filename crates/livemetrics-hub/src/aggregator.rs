//! 집계기.
//!
//! 저장소 스냅샷에서 요약 통계를 계산하고, 틱마다 시계열 포인트 하나를 추가한 뒤
//! 집계 채널로 발행한다.

use chrono::{DateTime, Timelike, Utc};
use livemetrics_core::config::MIN_INTERVAL;
use livemetrics_core::models::aggregate::{
    AggregatedMetrics, FeatureCount, FeatureUsageMetric, HourCount, MetricsTimeSeriesPoint, Trend,
};
use livemetrics_core::models::metric::UserMetric;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::subscription::{HubEvent, SubscriptionHub};
use crate::HubState;

/// 상위 기능/시간대 개수
pub const TOP_N: usize = 5;

/// 레코드 전체에서 집계 스냅샷 계산
pub fn aggregate(records: &[UserMetric]) -> AggregatedMetrics {
    let active: Vec<&UserMetric> = records.iter().filter(|m| m.is_active).collect();
    let avg_session_duration = if active.is_empty() {
        0.0
    } else {
        // 항마다 나눈 뒤 합산: 유한한 입력이면 결과도 유한
        let n = active.len() as f64;
        active.iter().map(|m| m.session_duration / n).sum::<f64>()
    };

    AggregatedMetrics {
        total_users: records.len(),
        active_users: active.len(),
        avg_session_duration,
        total_page_views: saturating_total(records.iter().map(|m| m.page_views)),
        total_events: saturating_total(records.iter().map(|m| m.events_triggered)),
        top_features: top_features(records, TOP_N),
        peak_hours: peak_hours(records, TOP_N),
    }
}

/// 카운터 합계. `u64::MAX`에서 멈춘다.
fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, u64::saturating_add)
}

/// `features_used` 포함 횟수 상위 `limit`개 (동점은 먼저 나온 순서 유지)
pub fn top_features(records: &[UserMetric], limit: usize) -> Vec<FeatureCount> {
    rank_by_count(
        records
            .iter()
            .flat_map(|m| m.features_used.iter().map(String::as_str)),
        limit,
    )
    .into_iter()
    .map(|(feature, count)| FeatureCount {
        feature: feature.to_string(),
        count,
    })
    .collect()
}

/// `timestamp`의 시(0-23, UTC)별 레코드 수 상위 `limit`개 (동점은 이른 시간 우선)
pub fn peak_hours(records: &[UserMetric], limit: usize) -> Vec<HourCount> {
    let mut hours = rank_by_count(records.iter().map(|m| m.timestamp.hour()), usize::MAX);
    hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hours.truncate(limit);
    hours
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// 기능별 사용 통계 (사용 횟수 내림차순)
///
/// `trend`는 과거 기준선이 없어 항상 `Stable`.
pub fn feature_usage(records: &[UserMetric]) -> Vec<FeatureUsageMetric> {
    struct Acc<'a> {
        count: u64,
        users: HashSet<&'a str>,
        total_time: f64,
    }

    let mut order: Vec<&str> = Vec::new();
    let mut stats: HashMap<&str, Acc> = HashMap::new();

    for metric in records {
        for feature in &metric.features_used {
            let acc = stats.entry(feature.as_str()).or_insert_with(|| {
                order.push(feature.as_str());
                Acc {
                    count: 0,
                    users: HashSet::new(),
                    total_time: 0.0,
                }
            });
            acc.count = acc.count.saturating_add(1);
            acc.users.insert(metric.user_id.as_str());
            acc.total_time += metric.feature_time.get(feature).copied().unwrap_or(0.0);
        }
    }

    let mut usage: Vec<FeatureUsageMetric> = order
        .into_iter()
        .filter_map(|feature| {
            let acc = stats.get(feature)?;
            Some(FeatureUsageMetric {
                feature: feature.to_string(),
                usage_count: acc.count,
                unique_users: acc.users.len() as u64,
                avg_duration: acc.total_time / acc.count as f64,
                trend: Trend::Stable,
            })
        })
        .collect();
    usage.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
    usage
}

/// 집계 결과에서 시계열 포인트 생성
///
/// 참여도는 활성 사용자 평균 세션 시간을 사용한다.
pub fn time_series_point(metrics: &AggregatedMetrics, at: DateTime<Utc>) -> MetricsTimeSeriesPoint {
    MetricsTimeSeriesPoint {
        timestamp: at,
        active_users: metrics.active_users,
        total_events: metrics.total_events,
        avg_engagement: metrics.avg_session_duration,
    }
}

/// 키별 등장 횟수를 세어 내림차순 상위 `limit`개 반환
///
/// 정렬이 안정적이라 동점은 처음 등장한 순서를 따른다.
fn rank_by_count<K, I>(keys: I, limit: usize) -> Vec<(K, u64)>
where
    K: Eq + Hash + Copy,
    I: IntoIterator<Item = K>,
{
    let mut counts: Vec<(K, u64)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 = counts[i].1.saturating_add(1),
            None => {
                index.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

/// 주기 집계 작업
#[derive(Clone)]
pub struct Aggregator {
    state: Arc<HubState>,
    subscriptions: SubscriptionHub,
}

impl Aggregator {
    pub fn new(state: Arc<HubState>, subscriptions: SubscriptionHub) -> Self {
        Self {
            state,
            subscriptions,
        }
    }

    /// 집계 1회 실행
    ///
    /// 저장소는 복사 시점에만 읽기 락을 잡고, 발행은 모든 락을 놓은 뒤에 한다.
    pub fn tick(&self) -> AggregatedMetrics {
        let records = self.state.store.get_all();
        let metrics = aggregate(&records);

        self.state
            .series
            .push(time_series_point(&metrics, Utc::now()));

        debug!(
            "집계 완료: 사용자={}, 활성={}, 이벤트={}",
            metrics.total_users, metrics.active_users, metrics.total_events
        );
        self.subscriptions
            .publish(HubEvent::Aggregates(metrics.clone()));
        metrics
    }

    /// 종료 신호까지 `period`마다 집계 (첫 실행은 한 주기 뒤)
    pub async fn run(self, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let period = period.max(MIN_INTERVAL);
        info!("집계기 시작: 주기={}ms", period.as_millis());

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("집계기 종료");
    }
}
