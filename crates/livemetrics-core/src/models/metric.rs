//! 사용자별 참여 메트릭 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 활성 사용자 한 명의 최신 메트릭 스냅샷
///
/// `user_id` 기준으로 저장되며, 같은 `user_id`의 쓰기는 이전 레코드를
/// 통째로 대체한다 (필드 단위 병합 없음).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetric {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// 세션 시간 (분)
    pub session_duration: f64,
    pub page_views: u64,
    pub click_count: u64,
    /// 스크롤 깊이 (0-100 %)
    pub scroll_depth: f64,

    /// 사용한 기능 이름 (중복 없음, 최초 등장 순서)
    pub features_used: Vec<String>,
    pub active_feature: String,
    /// 기능별 누적 사용 시간 (분)
    pub feature_time: BTreeMap<String, f64>,

    pub events_triggered: u64,
    pub queries_run: u64,
    pub reports_created: u64,
    pub dashboards_viewed: u64,

    pub is_active: bool,
    pub last_action: String,
    pub last_action_time: DateTime<Utc>,
    /// 마지막 갱신 시각
    pub timestamp: DateTime<Utc>,
}

impl UserMetric {
    /// 최소 필드만 채운 메트릭 생성 (나머지는 0/기본값)
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            email: None,
            company: None,
            session_duration: 0.0,
            page_views: 0,
            click_count: 0,
            scroll_depth: 0.0,
            features_used: Vec::new(),
            active_feature: crate::normalize::DEFAULT_ACTIVE_FEATURE.to_string(),
            feature_time: BTreeMap::new(),
            events_triggered: 0,
            queries_run: 0,
            reports_created: 0,
            dashboards_viewed: 0,
            is_active: true,
            last_action: crate::normalize::DEFAULT_LAST_ACTION.to_string(),
            last_action_time: now,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let mut metric = UserMetric::new("u1", "Alice");
        metric.page_views = 3;
        let json = serde_json::to_value(&metric).unwrap();

        assert_eq!(json["userId"], "u1");
        assert_eq!(json["pageViews"], 3);
        assert_eq!(json["activeFeature"], "Dashboard");
        assert!(json.get("email").is_none());
    }
}
