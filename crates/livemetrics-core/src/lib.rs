//! # livemetrics-core
//!
//! LiveMetrics 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 도메인 데이터 구조체 (camelCase JSON 와이어 포맷)
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스
//! - [`normalize`]: 이기종 업스트림 페이로드 정규화
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod normalize;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::event::{RealtimeEvent, RealtimeEventType};

    #[test]
    fn realtime_event_serde_roundtrip() {
        let event = RealtimeEvent::new(
            RealtimeEventType::QueryRun,
            "u1",
            "Alice",
            serde_json::json!({ "query": "select 1" }),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"query_run\""));
        assert!(json.contains("\"userId\":\"u1\""));

        let deserialized: RealtimeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.hub.aggregation_interval_ms, 5_000);
        assert_eq!(config.hub.event_log_capacity, 100);
        assert_eq!(config.hub.time_series_capacity, 100);
        assert_eq!(config.reconnect.delay_ms, 5_000);
        assert!(config.reconnect.max_attempts.is_none());
        assert!(config.sources.poll.is_empty());
    }
}
