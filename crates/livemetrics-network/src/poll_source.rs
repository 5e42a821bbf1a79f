//! HTTP 폴링 소스.
//!
//! 주기마다 `GET url` → `{metrics: [...], events: [...]}`.
//! 메트릭은 일괄 수집, 이벤트는 합성 없이 그대로 발행한다.
//! 요청 실패는 로그만 남기고 다음 주기에 다시 시도한다.

use livemetrics_core::config::{PollSourceConfig, MIN_INTERVAL};
use livemetrics_core::error::CoreError;
use livemetrics_core::models::event::RealtimeEvent;
use livemetrics_core::ports::ingest::MetricSink;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::runner::shutdown_requested;

/// 요청 제한 시간
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Deserialize)]
struct PollPayload {
    #[serde(default)]
    metrics: Vec<Value>,
    #[serde(default)]
    events: Vec<Value>,
}

/// 폴링 1회 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub metrics: usize,
    pub events: usize,
}

/// 주기적 HTTP 폴링 소스
pub struct PollSource {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    sink: Arc<dyn MetricSink>,
}

impl PollSource {
    pub fn new(url: &str, interval: Duration, sink: Arc<dyn MetricSink>) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
            interval: interval.max(MIN_INTERVAL),
            sink,
        })
    }

    pub fn from_config(config: &PollSourceConfig, sink: Arc<dyn MetricSink>) -> Result<Self, CoreError> {
        Self::new(&config.url, config.interval(), sink)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 한 번 가져와서 수집
    ///
    /// 메트릭 묶음이 거부되어도 이벤트는 발행한다. 형식이 틀린 이벤트는 개별로 버린다.
    pub async fn poll_once(&self) -> Result<PollOutcome, CoreError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("폴링 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Network(format!("폴링 응답 에러 ({status})")));
        }

        let payload: PollPayload = resp
            .json()
            .await
            .map_err(|e| CoreError::Network(format!("폴링 응답 파싱 실패: {e}")))?;

        let mut outcome = PollOutcome::default();
        match self.sink.push_bulk(&payload.metrics) {
            Ok(count) => outcome.metrics = count,
            Err(e) => warn!("폴링 메트릭 거부 ({}): {e}", self.url),
        }

        for raw in payload.events {
            match serde_json::from_value::<RealtimeEvent>(raw) {
                Ok(event) => {
                    self.sink.publish_event(event);
                    outcome.events += 1;
                }
                Err(e) => warn!("폴링 이벤트 무시: {e}"),
            }
        }

        Ok(outcome)
    }

    /// 종료 신호까지 주기 폴링 (첫 요청은 한 주기 뒤)
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("폴링 시작: {} (주기 {}ms)", self.url, self.interval.as_millis());

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(outcome) => debug!(
                            "폴링 완료 ({}): 메트릭 {}건, 이벤트 {}건",
                            self.url, outcome.metrics, outcome.events
                        ),
                        Err(e) => warn!("폴링 실패 ({}): {e}", self.url),
                    }
                }
                _ = shutdown_requested(&mut shutdown_rx) => break,
            }
        }

        info!("폴링 종료: {}", self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livemetrics_core::config::HubConfig;
    use livemetrics_core::models::event::RealtimeEventType;
    use livemetrics_hub::LiveMetricsHub;

    const BODY: &str = r#"{
        "metrics": [
            {"user_id": "u1", "name": "Alice", "features_accessed": ["reports"]},
            {"userId": "u2", "userName": "Bob"}
        ],
        "events": [
            {"type": "user_joined", "userId": "u3", "userName": "Carol", "data": {}},
            {"type": "not_a_type", "userId": "u4"}
        ]
    }"#;

    #[tokio::test]
    async fn poll_once_ingests_metrics_and_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let hub = LiveMetricsHub::new(HubConfig::default());
        let source = PollSource::new(
            &format!("{}/metrics", server.url()),
            Duration::from_secs(5),
            hub.sink(),
        )
        .unwrap();

        let outcome = source.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome {
                metrics: 2,
                events: 1
            }
        );
        assert_eq!(hub.metrics_count(), 2);

        // 일괄 수집은 합성 이벤트를 만들지 않는다
        let events = hub.get_recent_events(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, RealtimeEventType::UserJoined);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/metrics")
            .with_status(500)
            .create_async()
            .await;

        let hub = LiveMetricsHub::new(HubConfig::default());
        let source = PollSource::new(
            &format!("{}/metrics", server.url()),
            Duration::from_secs(5),
            hub.sink(),
        )
        .unwrap();

        assert!(matches!(source.poll_once().await, Err(CoreError::Network(_))));
        assert_eq!(hub.metrics_count(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn run_keeps_polling_after_failures() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/metrics")
            .with_status(502)
            .expect_at_least(2)
            .create_async()
            .await;

        let hub = LiveMetricsHub::new(HubConfig::default());
        let source = PollSource::new(
            &format!("{}/metrics", server.url()),
            Duration::from_millis(30),
            hub.sink(),
        )
        .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(source.run(rx));

        tokio::time::sleep(Duration::from_millis(200)).await;
        failing.assert_async().await;
        failing.remove_async().await;

        let ok = server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .expect_at_least(1)
            .create_async()
            .await;

        for _ in 0..50 {
            if hub.metrics_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.metrics_count(), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn zero_interval_does_not_stop_polling() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/metrics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .expect_at_least(1)
            .create_async()
            .await;

        let hub = LiveMetricsHub::new(HubConfig::default());
        let source =
            PollSource::new(&format!("{}/metrics", server.url()), Duration::ZERO, hub.sink())
                .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(source.run(rx));

        for _ in 0..100 {
            if hub.metrics_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.metrics_count(), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
