//! 허브 서비스.
//!
//! 저장소, 버퍼, 집계기, 구독 허브, 게이트웨이를 묶고
//! 집계 타이머와 수집 소스 작업의 시작/종료를 관리한다.

use livemetrics_core::config::HubConfig;
use livemetrics_core::error::CoreError;
use livemetrics_core::models::aggregate::{
    AggregatedMetrics, FeatureUsageMetric, MetricsTimeSeriesPoint,
};
use livemetrics_core::models::event::RealtimeEvent;
use livemetrics_core::models::metric::UserMetric;
use livemetrics_core::models::snapshot::DashboardSnapshot;
use livemetrics_core::ports::ingest::MetricSink;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{self, Aggregator};
use crate::gateway::IngestionGateway;
use crate::subscription::{Channel, HubEvent, Subscription, SubscriptionHub};
use crate::HubState;

/// 종료 시 작업별 대기 한도
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// 라이브 메트릭 허브
///
/// 전역 상태 없이 인스턴스별로 독립적이다. `start` 이후에만 집계가 돈다.
pub struct LiveMetricsHub {
    config: HubConfig,
    state: Arc<HubState>,
    subscriptions: SubscriptionHub,
    gateway: IngestionGateway,
    shutdown_tx: watch::Sender<bool>,
    running: AtomicBool,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl LiveMetricsHub {
    pub fn new(config: HubConfig) -> Self {
        let state = Arc::new(HubState::new(
            config.event_log_capacity,
            config.time_series_capacity,
        ));
        let subscriptions = SubscriptionHub::new();
        let gateway = IngestionGateway::new(state.clone(), subscriptions.clone());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            state,
            subscriptions,
            gateway,
            shutdown_tx,
            running: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// 집계 타이머 시작. 이미 실행 중이면 무시.
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("허브 이미 실행 중");
            return;
        }
        self.shutdown_tx.send_replace(false);

        let aggregator = Aggregator::new(self.state.clone(), self.subscriptions.clone());
        let period = self.config.aggregation_interval();
        let handle = tokio::spawn(aggregator.run(period, self.shutdown_tx.subscribe()));
        self.tasks.lock().push(("aggregator".to_string(), handle));

        info!(
            "허브 시작: 집계 주기={}ms, 이벤트 용량={}, 시계열 용량={}",
            period.as_millis(),
            self.state.events.capacity(),
            self.state.series.capacity()
        );
    }

    /// 허브 종료 신호에 묶인 작업 등록 (수집 소스 등)
    ///
    /// `task`는 종료 수신기를 받아 신호가 오면 스스로 끝나야 한다.
    /// 한도 안에 끝나지 않으면 `stop`이 중단시킨다.
    pub fn attach<F, Fut>(&self, name: impl Into<String>, task: F)
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(task(self.shutdown_tx.subscribe()));
        debug!("작업 등록: {}", name);
        self.tasks.lock().push((name, handle));
    }

    /// 집계 타이머와 등록된 모든 작업 종료
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        self.running.store(false, Ordering::SeqCst);

        let tasks: Vec<(String, JoinHandle<()>)> = std::mem::take(&mut *self.tasks.lock());
        for (name, mut handle) in tasks {
            match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => debug!("작업 종료: {}", name),
                Ok(Err(e)) => warn!("작업 비정상 종료: {} ({e})", name),
                Err(_) => {
                    warn!("작업 종료 대기 초과, 중단: {}", name);
                    handle.abort();
                }
            }
        }

        info!("허브 종료");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn gateway(&self) -> &IngestionGateway {
        &self.gateway
    }

    /// 어댑터에 넘길 수집 포트
    pub fn sink(&self) -> Arc<dyn MetricSink> {
        Arc::new(self.gateway.clone())
    }

    pub fn subscriptions(&self) -> &SubscriptionHub {
        &self.subscriptions
    }

    pub fn subscribe<F>(&self, channel: Channel, listener: F) -> Subscription
    where
        F: Fn(&HubEvent) -> Result<(), CoreError> + Send + Sync + 'static,
    {
        self.subscriptions.subscribe(channel, listener)
    }

    /// 집계 1회 즉시 실행 (시계열 추가 + 발행)
    pub fn aggregate_now(&self) -> AggregatedMetrics {
        Aggregator::new(self.state.clone(), self.subscriptions.clone()).tick()
    }

    pub fn get_all_user_metrics(&self) -> Vec<UserMetric> {
        self.state.store.get_all()
    }

    /// 사용자 한 명의 최신 메트릭
    pub fn get_user_metric(&self, user_id: &str) -> Result<UserMetric, CoreError> {
        self.state.store.get(user_id).ok_or_else(|| CoreError::NotFound {
            resource_type: "UserMetric".to_string(),
            id: user_id.to_string(),
        })
    }

    /// 현재 저장소에서 새로 계산한 집계 (시계열에는 추가하지 않음)
    pub fn get_aggregated_metrics(&self) -> AggregatedMetrics {
        aggregator::aggregate(&self.state.store.get_all())
    }

    pub fn get_time_series(&self) -> Vec<MetricsTimeSeriesPoint> {
        self.state.series.points()
    }

    pub fn get_recent_events(&self, limit: usize) -> Vec<RealtimeEvent> {
        self.state.events.recent(limit)
    }

    pub fn get_feature_usage(&self) -> Vec<FeatureUsageMetric> {
        aggregator::feature_usage(&self.state.store.get_all())
    }

    /// 대시보드 조회용 전체 상태
    pub fn snapshot(&self) -> DashboardSnapshot {
        let user_metrics = self.state.store.get_all();
        DashboardSnapshot {
            success: true,
            aggregated_metrics: aggregator::aggregate(&user_metrics),
            feature_usage: aggregator::feature_usage(&user_metrics),
            time_series_data: self.state.series.points(),
            recent_events: self.state.events.recent(self.state.events.capacity()),
            user_metrics,
        }
    }

    pub fn metrics_count(&self) -> usize {
        self.state.store.len()
    }

    /// 저장소, 이벤트 로그, 시계열 초기화
    pub fn reset(&self) {
        self.state.reset();
        info!("허브 상태 초기화");
    }
}
