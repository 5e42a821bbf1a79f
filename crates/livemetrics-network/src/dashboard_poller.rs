//! 원격 대시보드 폴러.
//!
//! `GET {base}/api/metrics/current`를 주기적으로 조회하고,
//! 변경 감지기가 변경으로 판단한 경우에만 로컬 상태를 교체하고 구독자에게 알린다.

use livemetrics_core::config::{DashboardConfig, MIN_INTERVAL};
use livemetrics_core::error::CoreError;
use livemetrics_core::models::snapshot::DashboardSnapshot;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::change_detector::ChangeDetector;
use crate::runner::shutdown_requested;

/// 요청 제한 시간
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 원격 허브 상태 폴러
pub struct DashboardPoller {
    client: reqwest::Client,
    endpoint: String,
    interval: Duration,
    detector: Mutex<ChangeDetector>,
    latest: watch::Sender<Option<Arc<DashboardSnapshot>>>,
}

impl DashboardPoller {
    pub fn new(base_url: &str, interval: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;
        let (latest, _) = watch::channel(None);

        Ok(Self {
            client,
            endpoint: format!("{}/api/metrics/current", base_url.trim_end_matches('/')),
            interval: interval.max(MIN_INTERVAL),
            detector: Mutex::new(ChangeDetector::new()),
            latest,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, CoreError> {
        Self::new(&config.base_url, config.interval())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 상태 변경 구독. 변경이 감지된 조회마다 한 번 알림.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DashboardSnapshot>>> {
        self.latest.subscribe()
    }

    /// 마지막으로 반영된 상태
    pub fn latest(&self) -> Option<Arc<DashboardSnapshot>> {
        self.latest.borrow().clone()
    }

    /// 1회 조회. 로컬 상태가 바뀌었으면 true.
    pub async fn poll_once(&self) -> Result<bool, CoreError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("대시보드 조회 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Network(format!("대시보드 응답 에러 ({status})")));
        }

        let snapshot: DashboardSnapshot = resp
            .json()
            .await
            .map_err(|e| CoreError::Network(format!("대시보드 응답 파싱 실패: {e}")))?;
        if !snapshot.success {
            return Err(CoreError::Network("대시보드 응답 success=false".to_string()));
        }

        if !self.detector.lock().observe(&snapshot) {
            debug!("대시보드 변경 없음");
            return Ok(false);
        }

        self.latest.send_replace(Some(Arc::new(snapshot)));
        Ok(true)
    }

    /// 종료 신호까지 주기 조회 (첫 조회는 즉시)
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("대시보드 폴러 시작: {}", self.endpoint);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(true) => debug!("대시보드 상태 갱신"),
                        Ok(false) => {}
                        Err(e) => warn!("대시보드 조회 실패: {e}"),
                    }
                }
                _ = shutdown_requested(&mut shutdown_rx) => break,
            }
        }

        info!("대시보드 폴러 종료");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(total_events: u64, avg_session: f64) -> String {
        json!({
            "success": true,
            "userMetrics": [],
            "aggregatedMetrics": {
                "totalUsers": 2,
                "activeUsers": 1,
                "avgSessionDuration": avg_session,
                "totalPageViews": 10,
                "totalEvents": total_events,
                "topFeatures": [],
                "peakHours": []
            },
            "timeSeriesData": [],
            "recentEvents": [],
            "featureUsage": []
        })
        .to_string()
    }

    async fn serve(server: &mut mockito::ServerGuard, body: String) -> mockito::Mock {
        server
            .mock("GET", "/api/metrics/current")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn same_payload_twice_updates_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/metrics/current")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body(7, 3.0))
            .expect(2)
            .create_async()
            .await;

        let poller = DashboardPoller::new(&server.url(), Duration::from_secs(5)).unwrap();
        let mut rx = poller.subscribe();

        assert!(poller.poll_once().await.unwrap());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!poller.poll_once().await.unwrap());
        assert!(!rx.has_changed().unwrap());

        let latest = poller.latest().unwrap();
        assert_eq!(latest.aggregated_metrics.total_events, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unfingerprinted_change_is_not_applied() {
        let mut server = mockito::Server::new_async().await;
        let first = serve(&mut server, body(7, 3.0)).await;

        let poller = DashboardPoller::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(poller.poll_once().await.unwrap());
        first.remove_async().await;

        // 평균 세션 시간만 바뀜
        let second = serve(&mut server, body(7, 99.0)).await;
        let mut rx = poller.subscribe();
        assert!(!poller.poll_once().await.unwrap());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(
            poller.latest().unwrap().aggregated_metrics.avg_session_duration,
            3.0
        );
        second.remove_async().await;

        // 지문 필드가 바뀌면 반영
        let _third = serve(&mut server, body(8, 99.0)).await;
        assert!(poller.poll_once().await.unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            poller.latest().unwrap().aggregated_metrics.avg_session_duration,
            99.0
        );
    }

    #[tokio::test]
    async fn failed_response_leaves_state_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/metrics/current")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false}"#)
            .create_async()
            .await;

        let poller = DashboardPoller::new(&format!("{}/", server.url()), Duration::from_secs(5))
            .unwrap();
        assert!(!poller.endpoint().contains("//api"));
        assert!(poller.poll_once().await.is_err());
        assert!(poller.latest().is_none());
    }

    #[tokio::test]
    async fn zero_interval_run_applies_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let _mock = serve(&mut server, body(3, 1.0)).await;

        let poller = Arc::new(DashboardPoller::new(&server.url(), Duration::ZERO).unwrap());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poller.clone().run(rx));

        for _ in 0..100 {
            if poller.latest().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(poller.latest().unwrap().aggregated_metrics.total_events, 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
