//! 메트릭 수집/조회 API 핸들러.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use livemetrics_core::models::metric::UserMetric;
use livemetrics_core::models::snapshot::DashboardSnapshot;
use livemetrics_core::ports::ingest::MetricSink;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::AppState;

/// 단건 수집 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub user_id: String,
}

/// 일괄 수집 응답
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub count: usize,
}

/// 전체 메트릭 응답 (폴링 소스 형식)
#[derive(Debug, Serialize)]
pub struct MetricsListResponse {
    pub metrics: Vec<UserMetric>,
    /// 항상 빈 배열
    pub events: Vec<Value>,
}

/// 단순 성공 응답
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// 메트릭 단건 수집
///
/// POST /api/metrics
pub async fn push_metric(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PushResponse>, ApiError> {
    let Json(raw) = payload?;
    let metric = state.hub.gateway().push_one(&raw)?;

    Ok(Json(PushResponse {
        success: true,
        user_id: metric.user_id,
    }))
}

/// 메트릭 일괄 수집
///
/// POST /api/metrics/bulk  `{metrics: [...]}`
pub async fn push_bulk(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BulkResponse>, ApiError> {
    let Json(body) = payload?;
    let raws = body
        .get("metrics")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::BadRequest("metrics 배열이 필요합니다".to_string()))?;

    let count = state.hub.gateway().push_bulk(raws)?;
    Ok(Json(BulkResponse {
        success: true,
        count,
    }))
}

/// 현재 메트릭 전체
///
/// GET /api/metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsListResponse> {
    Json(MetricsListResponse {
        metrics: state.hub.get_all_user_metrics(),
        events: Vec::new(),
    })
}

/// 사용자 한 명의 최신 메트릭
///
/// GET /api/metrics/{user_id}
pub async fn get_user_metric(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserMetric>, ApiError> {
    Ok(Json(state.hub.get_user_metric(&user_id)?))
}

/// 대시보드 전체 상태
///
/// GET /api/metrics/current
pub async fn get_current(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.hub.snapshot())
}

/// 저장소, 이벤트 로그, 시계열 초기화
///
/// DELETE /api/metrics
pub async fn reset_metrics(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.hub.reset();
    Json(SuccessResponse { success: true })
}
