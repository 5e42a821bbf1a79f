//! 메트릭 수집 포트.
//!
//! 구현: `livemetrics-hub` crate (`IngestionGateway`)

use serde_json::Value;

use crate::error::CoreError;
use crate::models::event::RealtimeEvent;
use crate::models::metric::UserMetric;

/// 수집 어댑터(폴링, 스트림, HTTP)가 정규화 전 페이로드를 넘기는 입구
///
/// 모든 연산은 인메모리이므로 동기 호출이다.
pub trait MetricSink: Send + Sync {
    /// 단일 페이로드 정규화 후 저장, 사용자 메트릭 갱신 + `feature_used` 이벤트 발행
    fn push_one(&self, raw: &Value) -> Result<UserMetric, CoreError>;

    /// 여러 페이로드를 한 단위로 저장, 사용자 메트릭 갱신 1회 발행
    ///
    /// 하나라도 정규화에 실패하면 아무것도 저장하지 않는다.
    fn push_bulk(&self, raws: &[Value]) -> Result<usize, CoreError>;

    /// 외부에서 받은 이벤트를 그대로 이벤트 로그에 추가하고 발행
    fn publish_event(&self, event: RealtimeEvent);
}
