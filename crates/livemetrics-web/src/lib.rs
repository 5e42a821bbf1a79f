//! # livemetrics-web
//!
//! LiveMetrics 수집 서버.
//! Axum 기반 HTTP 수집 API + SSE/WebSocket 실시간 팬아웃.
//!
//! ## 기능
//! - 메트릭 단건/일괄 수집, 이벤트 발행
//! - 현재 메트릭 및 대시보드 상태 조회, 초기화
//! - SSE(`/api/stream`)와 WebSocket(`/api/ws`)으로 갱신 전달
//! - 헬스 체크(`/health`)

pub mod error;
pub mod handlers;
pub mod routes;

use axum::routing::get;
use axum::Router;
use livemetrics_core::config::WebConfig;
use livemetrics_hub::{Channel, HubEvent, LiveMetricsHub, Subscription};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use handlers::stream::StreamFrame;

/// 스트림 브로드캐스트 채널 용량
const STREAM_CHANNEL_CAPACITY: usize = 256;

/// 포트 바인드 최대 시도 횟수
const MAX_PORT_ATTEMPTS: u16 = 10;

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 라이브 메트릭 허브
    pub hub: Arc<LiveMetricsHub>,
    /// SSE/WebSocket 클라이언트 송신 채널
    pub stream_tx: broadcast::Sender<StreamFrame>,
    /// 서버 상태 생성 시각
    pub started_at: Instant,
}

impl AppState {
    pub fn new(hub: Arc<LiveMetricsHub>) -> Self {
        let (stream_tx, _) = broadcast::channel(STREAM_CHANNEL_CAPACITY);
        Self {
            hub,
            stream_tx,
            started_at: Instant::now(),
        }
    }

    /// 현재 연결된 SSE/WebSocket 클라이언트 수
    pub fn client_count(&self) -> usize {
        self.stream_tx.receiver_count()
    }

    /// 허브의 사용자 메트릭/이벤트 채널을 스트림 채널로 연결
    pub fn bridge(&self) -> Vec<Subscription> {
        let metrics_tx = self.stream_tx.clone();
        let metrics = self.hub.subscribe(Channel::UserMetrics, move |event| {
            if let HubEvent::UserMetrics(metrics) = event {
                // 수신자가 없으면 send가 실패한다. 버려도 된다.
                let _ = metrics_tx.send(StreamFrame::Metrics(metrics.clone()));
            }
            Ok(())
        });

        let events_tx = self.stream_tx.clone();
        let events = self.hub.subscribe(Channel::Events, move |event| {
            if let HubEvent::Event(event) = event {
                let _ = events_tx.send(StreamFrame::Event(event.clone()));
            }
            Ok(())
        });

        vec![metrics, events]
    }
}

/// 라우터 구성
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(handlers::health::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 수집 서버
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(hub: Arc<LiveMetricsHub>, config: WebConfig) -> Self {
        Self {
            config,
            state: AppState::new(hub),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// 서버 실행
    ///
    /// 기본 포트에서 시작하여, 포트가 이미 사용 중이면 다음 포트를 시도합니다.
    /// 최대 10개 포트를 시도한 후 실패하면 에러를 반환합니다.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let host = if self.config.allow_external {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let base_port = self.config.port;
        let mut last_error = None;

        for attempt in 0..MAX_PORT_ATTEMPTS {
            let port = base_port.saturating_add(attempt);

            // 포트 오버플로우 체크
            if port < base_port && attempt > 0 {
                break;
            }

            let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
                Ok(a) => a,
                Err(e) => {
                    error!("잘못된 주소 {}:{}: {}", host, port, e);
                    continue;
                }
            };

            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    if attempt > 0 {
                        warn!("포트 {} 사용 불가, 대체 포트 {} 사용", base_port, port);
                    }
                    return self.serve(listener, shutdown_rx).await;
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::AddrInUse {
                        warn!("포트 {} 이미 사용 중, 다음 포트 시도...", port);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!(
                    "포트 {}-{} 모두 사용 불가",
                    base_port,
                    base_port.saturating_add(MAX_PORT_ATTEMPTS - 1)
                ),
            )
        }))
    }

    /// 이미 바인드된 리스너로 서버 실행 (종료 신호까지)
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let subscriptions = self.state.bridge();
        let app = router(self.state);

        info!("수집 서버 시작: http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown_rx.borrow() {
                        info!("수집 서버 종료 신호 수신");
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        info!("수집 서버 종료");
        Ok(())
    }

    /// 서버 URL 반환
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use livemetrics_core::config::HubConfig;
    use livemetrics_core::ports::ingest::MetricSink;
    use tower::ServiceExt;

    fn hub() -> Arc<LiveMetricsHub> {
        Arc::new(LiveMetricsHub::new(HubConfig::default()))
    }

    #[test]
    fn default_url() {
        let server = WebServer::new(hub(), WebConfig::default());
        assert_eq!(server.url(), "http://localhost:3001");
    }

    /// `/health`에 응답하는 우리 서버인지 확인
    async fn serves_health(port: u16) -> bool {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let exchange = async {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await?;
            stream
                .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await?;
            let mut response = String::new();
            stream.read_to_string(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };

        match tokio::time::timeout(std::time::Duration::from_millis(500), exchange).await {
            Ok(Ok(response)) => response.contains("\"metricsCount\""),
            _ => false,
        }
    }

    #[tokio::test]
    async fn run_falls_back_when_port_is_taken() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_port = occupied.local_addr().unwrap().port();
        if base_port > u16::MAX - MAX_PORT_ATTEMPTS {
            return;
        }

        let config = WebConfig {
            port: base_port,
            ..WebConfig::default()
        };
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(WebServer::new(hub(), config).run(rx));

        let mut served_on = None;
        for _ in 0..100 {
            for port in base_port + 1..base_port + MAX_PORT_ATTEMPTS {
                if serves_health(port).await {
                    served_on = Some(port);
                    break;
                }
            }
            if served_on.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(served_on.is_some());

        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
        drop(occupied);
    }

    #[test]
    fn metrics_list_has_empty_events() {
        let state = AppState::new(hub());
        let axum::Json(body) = tokio_test::block_on(handlers::metrics::get_metrics(
            axum::extract::State(state),
        ));
        assert!(body.metrics.is_empty());
        assert!(body.events.is_empty());
    }

    #[tokio::test]
    async fn bridge_forwards_hub_updates() {
        let state = AppState::new(hub());
        let _subs = state.bridge();
        let mut rx = state.stream_tx.subscribe();
        assert_eq!(state.client_count(), 1);

        state
            .hub
            .gateway()
            .push_one(&serde_json::json!({ "userId": "u1" }))
            .unwrap();

        assert!(matches!(rx.recv().await.unwrap(), StreamFrame::Metrics(m) if m.len() == 1));
        assert!(matches!(rx.recv().await.unwrap(), StreamFrame::Event(_)));
    }

    #[tokio::test]
    async fn health_reports_metrics_count() {
        let state = AppState::new(hub());
        state
            .hub
            .gateway()
            .push_one(&serde_json::json!({ "userId": "u1" }))
            .unwrap();

        let res = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["metricsCount"], 1);
        assert_eq!(json["clients"], 0);
    }
}
