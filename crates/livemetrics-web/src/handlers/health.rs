//! 헬스 체크 핸들러.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// 서버 가동 시간 (초)
    pub uptime: u64,
    /// 연결된 SSE/WebSocket 클라이언트 수
    pub clients: usize,
    pub metrics_count: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs(),
        clients: state.client_count(),
        metrics_count: state.hub.metrics_count(),
    })
}
