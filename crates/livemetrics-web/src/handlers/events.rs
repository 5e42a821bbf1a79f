//! 이벤트 수집 API 핸들러.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use livemetrics_core::models::event::RealtimeEvent;
use livemetrics_core::ports::ingest::MetricSink;

use super::metrics::SuccessResponse;
use crate::error::ApiError;
use crate::AppState;

/// 이벤트 발행. 이벤트 로그에 추가되고 연결된 스트림/소켓 클라이언트에 전달된다.
///
/// POST /api/events  `{type, userId, userName, data}`
pub async fn push_event(
    State(state): State<AppState>,
    payload: Result<Json<RealtimeEvent>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(event) = payload?;
    state.hub.gateway().publish_event(event);
    Ok(Json(SuccessResponse { success: true }))
}
