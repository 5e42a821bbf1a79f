//! SSE 단일 메트릭 스트림 소스.
//!
//! `reqwest` 응답 바이트 스트림을 `eventsource-stream`으로 파싱한다.
//! 각 `data:` 프레임은 `{"metric": {...}}` 형태.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use livemetrics_core::error::CoreError;
use livemetrics_core::models::metric::UserMetric;
use livemetrics_core::models::stream::SseFrame;
use livemetrics_core::ports::ingest::MetricSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::connector::{FrameConnector, FrameStream};
use crate::reconnect::ReconnectPolicy;
use crate::runner::{run_stream, StreamExit};

/// 연결 수립 제한 시간
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SSE 연결기
pub struct SseConnector {
    url: String,
    client: reqwest::Client,
}

impl SseConnector {
    pub fn new(url: &str) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl FrameConnector for SseConnector {
    fn target(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<FrameStream, CoreError> {
        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("SSE 연결 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Network(format!("SSE 응답 에러 ({status})")));
        }

        let frames = resp
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(Ok(event.data)),
                    Err(e) => Some(Err(CoreError::Network(format!("SSE 수신 에러: {e}")))),
                }
            })
            .boxed();
        Ok(frames)
    }
}

/// SSE 프레임 하나를 수집 포트로 전달
///
/// 메트릭 프레임만 처리한다. 이벤트 프레임은 건너뛰고 `None`을 돌려준다.
pub fn handle_frame(sink: &dyn MetricSink, data: &str) -> Result<Option<UserMetric>, CoreError> {
    match serde_json::from_str::<SseFrame>(data)? {
        SseFrame::Metric(raw) => sink.push_one(&raw).map(Some),
        SseFrame::Event(_) => {
            debug!("SSE 이벤트 프레임 건너뜀");
            Ok(None)
        }
    }
}

/// SSE 메트릭 스트림 수집
///
/// 잘못된 프레임은 로그만 남기고 버린다. 연결은 유지된다.
pub async fn connect_stream(
    url: &str,
    sink: Arc<dyn MetricSink>,
    policy: ReconnectPolicy,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<StreamExit, CoreError> {
    let connector = SseConnector::new(url)?;
    let exit = run_stream(&connector, &policy, shutdown_rx, |data| {
        if let Err(e) = handle_frame(sink.as_ref(), data) {
            warn!("잘못된 SSE 프레임 버림: {e}");
        }
    })
    .await;
    Ok(exit)
}
