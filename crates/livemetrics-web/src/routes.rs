//! API 라우트 정의.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성 (`/api` 아래에 중첩)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 메트릭 수집/조회
        .route(
            "/metrics",
            get(handlers::metrics::get_metrics)
                .post(handlers::metrics::push_metric)
                .delete(handlers::metrics::reset_metrics),
        )
        .route("/metrics/bulk", post(handlers::metrics::push_bulk))
        .route("/metrics/current", get(handlers::metrics::get_current))
        .route("/metrics/{user_id}", get(handlers::metrics::get_user_metric))
        // 이벤트
        .route("/events", post(handlers::events::push_event))
        // 실시간 스트림 (SSE, WebSocket)
        .route("/stream", get(handlers::stream::event_stream))
        .route("/ws", get(handlers::stream::ws_stream))
}
