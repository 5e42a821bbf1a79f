//! 수집 API 통합 테스트.
//!
//! 라우터에 직접 요청을 보내 응답 본문과 허브 상태를 함께 검증한다.

use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use livemetrics_core::config::HubConfig;
use livemetrics_hub::LiveMetricsHub;
use livemetrics_web::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn setup() -> (Arc<LiveMetricsHub>, Router) {
    let hub = Arc::new(LiveMetricsHub::new(HubConfig::default()));
    let app = router(AppState::new(hub.clone()));
    (hub, app)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn push_single_metric() {
    let (hub, app) = setup();

    let body = json!({ "user_id": "u1", "name": "Alice", "session_time_minutes": 12 }).to_string();
    let (status, json) = send(&app, Method::POST, "/api/metrics", Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": true, "userId": "u1" }));

    let stored = hub.get_all_user_metrics();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_name, "Alice");
    // FeatureUsed 이벤트가 로그에 남는다
    assert_eq!(hub.get_recent_events(10).len(), 1);
}

#[tokio::test]
async fn missing_user_id_is_bad_request() {
    let (hub, app) = setup();

    let body = json!({ "name": "nobody" }).to_string();
    let (status, json) = send(&app, Method::POST, "/api/metrics", Some(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("userId"));
    assert_eq!(hub.metrics_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (_hub, app) = setup();

    let (status, json) = send(&app, Method::POST, "/api/metrics", Some("{ nope")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn bulk_push_counts_records() {
    let (hub, app) = setup();

    let body = json!({
        "metrics": [
            { "userId": "a", "pageViews": 3 },
            { "userId": "b", "pageViews": 5 }
        ]
    })
    .to_string();
    let (status, json) = send(&app, Method::POST, "/api/metrics/bulk", Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": true, "count": 2 }));
    assert_eq!(hub.metrics_count(), 2);
}

#[tokio::test]
async fn bulk_push_is_all_or_nothing() {
    let (hub, app) = setup();

    let body = json!({ "metrics": [{ "userId": "a" }, { "pageViews": 1 }] }).to_string();
    let (status, json) = send(&app, Method::POST, "/api/metrics/bulk", Some(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("metrics[1]"));
    assert_eq!(hub.metrics_count(), 0);
}

#[tokio::test]
async fn bulk_push_requires_metrics_array() {
    let (_hub, app) = setup();

    let body = json!({ "metrics": "nope" }).to_string();
    let (status, json) = send(&app, Method::POST, "/api/metrics/bulk", Some(&body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn get_metrics_uses_poll_source_shape() {
    let (_hub, app) = setup();
    let body = json!({ "userId": "u1" }).to_string();
    send(&app, Method::POST, "/api/metrics", Some(&body)).await;

    let (status, json) = send(&app, Method::GET, "/api/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metrics"].as_array().unwrap().len(), 1);
    assert_eq!(json["metrics"][0]["userId"], "u1");
    assert_eq!(json["events"], json!([]));
}

#[tokio::test]
async fn current_snapshot_reflects_store() {
    let (hub, app) = setup();
    let body = json!({
        "metrics": [
            { "userId": "u1", "sessionDuration": 10, "isActive": true, "featuresUsed": ["Reports"] },
            { "userId": "u2", "sessionDuration": 20, "isActive": false }
        ]
    })
    .to_string();
    send(&app, Method::POST, "/api/metrics/bulk", Some(&body)).await;
    hub.aggregate_now();

    let (status, json) = send(&app, Method::GET, "/api/metrics/current", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["userMetrics"].as_array().unwrap().len(), 2);
    assert_eq!(json["aggregatedMetrics"]["totalUsers"], 2);
    assert_eq!(json["aggregatedMetrics"]["activeUsers"], 1);
    assert_eq!(json["aggregatedMetrics"]["avgSessionDuration"], 10.0);
    assert_eq!(json["timeSeriesData"].as_array().unwrap().len(), 1);
    assert!(json["featureUsage"].is_array());
    assert!(json["recentEvents"].is_array());
}

#[tokio::test]
async fn get_single_user_metric() {
    let (_hub, app) = setup();
    let body = json!({ "userId": "u1", "name": "Alice", "pageViews": 4 }).to_string();
    send(&app, Method::POST, "/api/metrics", Some(&body)).await;

    let (status, json) = send(&app, Method::GET, "/api/metrics/u1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["userId"], "u1");
    assert_eq!(json["userName"], "Alice");
    assert_eq!(json["pageViews"], 4);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let (_hub, app) = setup();

    let (status, json) = send(&app, Method::GET, "/api/metrics/ghost", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn delete_resets_everything() {
    let (hub, app) = setup();
    let body = json!({ "userId": "u1" }).to_string();
    send(&app, Method::POST, "/api/metrics", Some(&body)).await;
    hub.aggregate_now();

    let (status, json) = send(&app, Method::DELETE, "/api/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": true }));
    assert_eq!(hub.metrics_count(), 0);
    assert!(hub.get_recent_events(100).is_empty());
    assert!(hub.get_time_series().is_empty());
}

#[tokio::test]
async fn post_event_appends_to_log() {
    let (hub, app) = setup();

    let body = json!({
        "type": "query_run",
        "userId": "u7",
        "userName": "Grace",
        "data": { "query": "select 1" }
    })
    .to_string();
    let (status, json) = send(&app, Method::POST, "/api/events", Some(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let events = hub.get_recent_events(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, "u7");
    assert_eq!(events[0].data["query"], "select 1");
}

#[tokio::test]
async fn unknown_event_type_is_bad_request() {
    let (hub, app) = setup();

    let body = json!({ "type": "teleported", "userId": "u7" }).to_string();
    let (status, _json) = send(&app, Method::POST, "/api/events", Some(&body)).await;

    // axum 역직렬화 거부는 422이지만 JSON 거부는 모두 400으로 통일한다
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(hub.get_recent_events(10).is_empty());
}

#[tokio::test]
async fn health_reports_counts() {
    let (_hub, app) = setup();
    let body = json!({ "userId": "u1" }).to_string();
    send(&app, Method::POST, "/api/metrics", Some(&body)).await;

    let (status, json) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["metricsCount"], 1);
    assert!(json["uptime"].is_number());
}
