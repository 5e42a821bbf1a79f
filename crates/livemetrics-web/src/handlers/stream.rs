//! 실시간 팬아웃 핸들러 (SSE, WebSocket).
//!
//! 허브 알림은 [`StreamFrame`]으로 broadcast 채널에 실리고,
//! 연결된 클라이언트마다 자기 프로토콜 형식으로 변환해 보낸다.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use futures::stream::{self, Stream, StreamExt};
use livemetrics_core::models::event::RealtimeEvent;
use livemetrics_core::models::metric::UserMetric;
use livemetrics_core::models::stream::{SseFrame, StreamMessage};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::AppState;

/// 클라이언트로 내보낼 허브 알림
#[derive(Debug, Clone)]
pub enum StreamFrame {
    /// 이번 쓰기로 갱신된 사용자 메트릭
    Metrics(Vec<UserMetric>),
    Event(RealtimeEvent),
}

impl StreamFrame {
    /// SSE `data:` 본문 목록. 메트릭은 레코드마다 한 프레임.
    pub fn sse_payloads(&self) -> Vec<String> {
        let frames: Vec<SseFrame> = match self {
            StreamFrame::Metrics(metrics) => metrics
                .iter()
                .filter_map(|m| serde_json::to_value(m).ok())
                .map(SseFrame::Metric)
                .collect(),
            StreamFrame::Event(event) => vec![SseFrame::Event(event.clone())],
        };
        frames
            .iter()
            .filter_map(|f| serde_json::to_string(f).ok())
            .collect()
    }

    /// 푸시 스트림 메시지. 단건은 `user_metric`, 여러 건은 `bulk_metrics`.
    pub fn stream_message(&self) -> Option<StreamMessage> {
        match self {
            StreamFrame::Metrics(metrics) => match metrics.as_slice() {
                [] => None,
                [single] => Some(StreamMessage::UserMetric {
                    metric: serde_json::to_value(single).ok()?,
                }),
                many => Some(StreamMessage::BulkMetrics {
                    metrics: many
                        .iter()
                        .filter_map(|m| serde_json::to_value(m).ok())
                        .collect(),
                }),
            },
            StreamFrame::Event(event) => Some(StreamMessage::Event {
                event: event.clone(),
            }),
        }
    }
}

/// SSE 스트림 엔드포인트
///
/// GET /api/stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.stream_tx.subscribe();
    debug!("SSE 클라이언트 연결 (총 {})", state.client_count());

    let sse_stream = BroadcastStream::new(rx).flat_map(|result| {
        let events: Vec<Result<Event, Infallible>> = match result {
            Ok(frame) => frame
                .sse_payloads()
                .into_iter()
                .map(|data| Ok(Event::default().data(data)))
                .collect(),
            // 채널 지연 시 스킵
            Err(_) => Vec::new(),
        };
        stream::iter(events)
    });

    Sse::new(sse_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// WebSocket 엔드포인트
///
/// GET /api/ws
pub async fn ws_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.stream_tx.subscribe();
    debug!("WebSocket 클라이언트 연결 (총 {})", state.client_count());

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => {
                    let Some(message) = frame.stream_message() else {
                        continue;
                    };
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("스트림 메시지 직렬화 실패: {e}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket 클라이언트 지연, {}건 건너뜀", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket 수신 에러: {e}");
                    break;
                }
            },
        }
    }

    debug!("WebSocket 클라이언트 종료");
}
