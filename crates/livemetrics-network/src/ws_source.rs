//! WebSocket 푸시 스트림 소스.
//!
//! `tokio-tungstenite` 기반. 텍스트 프레임 하나가 [`StreamMessage`] 하나.

use async_trait::async_trait;
use futures::StreamExt;
use livemetrics_core::error::CoreError;
use livemetrics_core::models::stream::StreamMessage;
use livemetrics_core::ports::ingest::MetricSink;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::connector::{FrameConnector, FrameStream};
use crate::reconnect::ReconnectPolicy;
use crate::runner::{run_stream, StreamExit};

/// WebSocket 연결기
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// `http(s)://` 주소는 `ws(s)://`로 바꾼다
    pub fn new(url: &str) -> Result<Self, CoreError> {
        Ok(Self {
            url: to_ws_url(url)?,
        })
    }
}

fn to_ws_url(raw: &str) -> Result<String, CoreError> {
    let mut url =
        Url::parse(raw).map_err(|e| CoreError::Config(format!("잘못된 스트림 주소 {raw}: {e}")))?;
    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url.to_string()),
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(CoreError::Config(format!(
                "지원하지 않는 스트림 스킴: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| CoreError::Config(format!("스킴 변환 실패: {raw}")))?;
    Ok(url.to_string())
}

#[async_trait]
impl FrameConnector for WsConnector {
    fn target(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<FrameStream, CoreError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let frames = ws_stream
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                    Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => Some(Ok(text)),
                        Err(_) => {
                            debug!("UTF-8이 아닌 바이너리 프레임 무시");
                            None
                        }
                    },
                    // Ping/Pong은 자동 처리, Close 뒤에는 스트림이 끝난다
                    Ok(_) => None,
                    Err(e) => Some(Err(CoreError::Network(format!("WebSocket 수신 에러: {e}")))),
                }
            })
            .boxed();
        Ok(frames)
    }
}

/// 푸시 스트림 메시지 하나를 수집 포트로 전달
pub fn dispatch_message(sink: &dyn MetricSink, text: &str) -> Result<(), CoreError> {
    match serde_json::from_str::<StreamMessage>(text)? {
        StreamMessage::UserMetric { metric } => {
            sink.push_one(&metric)?;
        }
        StreamMessage::BulkMetrics { metrics } => {
            sink.push_bulk(&metrics)?;
        }
        StreamMessage::Event { event } => sink.publish_event(event),
    }
    Ok(())
}

/// 푸시 스트림 수집
///
/// 끊기면 정책 지연 뒤 재연결한다. 잘못된 메시지는 버리고 연결은 유지한다.
pub async fn stream_source(
    url: &str,
    sink: Arc<dyn MetricSink>,
    policy: ReconnectPolicy,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<StreamExit, CoreError> {
    let connector = WsConnector::new(url)?;
    let exit = run_stream(&connector, &policy, shutdown_rx, |text| {
        if let Err(e) = dispatch_message(sink.as_ref(), text) {
            warn!("스트림 메시지 무시: {e}");
        }
    })
    .await;
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use livemetrics_core::config::HubConfig;
    use livemetrics_core::models::event::RealtimeEventType;
    use livemetrics_hub::LiveMetricsHub;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn http_urls_become_ws() {
        assert_eq!(
            to_ws_url("http://localhost:3001/api/ws").unwrap(),
            "ws://localhost:3001/api/ws"
        );
        assert_eq!(
            to_ws_url("https://example.com/feed").unwrap(),
            "wss://example.com/feed"
        );
        assert_eq!(to_ws_url("ws://a:1/x").unwrap(), "ws://a:1/x");
        assert!(to_ws_url("ftp://a/x").is_err());
        assert!(to_ws_url("not a url").is_err());
    }

    #[test]
    fn dispatch_routes_by_type() {
        let hub = LiveMetricsHub::new(HubConfig::default());
        let sink = hub.sink();

        dispatch_message(
            sink.as_ref(),
            &json!({ "type": "user_metric", "metric": { "userId": "u1" } }).to_string(),
        )
        .unwrap();
        dispatch_message(
            sink.as_ref(),
            &json!({
                "type": "bulk_metrics",
                "metrics": [{ "userId": "u2" }, { "userId": "u3" }]
            })
            .to_string(),
        )
        .unwrap();
        dispatch_message(
            sink.as_ref(),
            &json!({
                "type": "event",
                "event": { "type": "query_run", "userId": "u2", "userName": "B", "data": {} }
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(hub.metrics_count(), 3);
        let events = hub.get_recent_events(10);
        // user_metric 합성 이벤트 + 직접 발행 이벤트
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, RealtimeEventType::QueryRun);
        assert_eq!(events[1].event_type, RealtimeEventType::FeatureUsed);
    }

    #[test]
    fn dispatch_rejects_malformed() {
        let hub = LiveMetricsHub::new(HubConfig::default());
        let sink = hub.sink();

        assert!(dispatch_message(sink.as_ref(), "not json").is_err());
        assert!(dispatch_message(sink.as_ref(), r#"{"type":"unknown"}"#).is_err());
        assert!(dispatch_message(sink.as_ref(), r#"{"type":"user_metric","metric":{}}"#).is_err());
        assert_eq!(hub.metrics_count(), 0);
    }

    #[tokio::test]
    async fn receives_messages_from_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::text("garbage")).await.unwrap();
            ws.send(Message::text(
                json!({ "type": "user_metric", "metric": { "userId": "remote" } }).to_string(),
            ))
            .await
            .unwrap();
            // 연결 유지
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let hub = LiveMetricsHub::new(HubConfig::default());
        let (tx, rx) = watch::channel(false);
        let sink = hub.sink();
        let url = format!("http://{addr}/feed");
        let handle = tokio::spawn(async move {
            stream_source(&url, sink, ReconnectPolicy::default(), rx).await
        });

        for _ in 0..100 {
            if hub.metrics_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.get_all_user_metrics()[0].user_id, "remote");

        tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), StreamExit::Shutdown);
    }
}
