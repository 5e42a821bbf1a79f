//! 실시간 활동 이벤트 모델.
//!
//! 활동 피드에 표시되는 불변(append-only) 이벤트.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 활동 이벤트 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeEventType {
    UserJoined,
    UserLeft,
    FeatureUsed,
    EventTriggered,
    QueryRun,
}

/// 활동 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub event_type: RealtimeEventType,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// 이벤트 상세 데이터 (형식 자유)
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    /// 현재 시각으로 이벤트 생성
    pub fn new(
        event_type: RealtimeEventType,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            user_id: user_id.into(),
            user_name: user_name.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}
