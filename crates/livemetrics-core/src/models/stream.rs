//! 스트림 와이어 메시지.
//!
//! - 푸시 스트림(WebSocket): `type`으로 구분되는 [`StreamMessage`]
//! - SSE: `data:` 한 줄에 [`SseFrame`] 하나
//!
//! 메트릭 본문은 정규화 전 원시 JSON이다. 수신측이 다시 정규화한다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::RealtimeEvent;

/// 푸시 스트림 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    UserMetric { metric: Value },
    BulkMetrics { metrics: Vec<Value> },
    Event { event: RealtimeEvent },
}

/// SSE 프레임
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SseFrame {
    Metric(Value),
    Event(RealtimeEvent),
}
