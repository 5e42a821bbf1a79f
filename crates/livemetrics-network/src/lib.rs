//! # livemetrics-network
//!
//! 외부 수집 소스 어댑터.
//! 모든 소스는 `MetricSink` 포트로만 허브에 쓰고, 허브 종료 신호(`watch`)에 맞춰 멈춘다.
//!
//! - [`poll_source`]: 주기적 HTTP GET (`{metrics, events}`)
//! - [`ws_source`]: WebSocket 푸시 스트림 (`type` 구분 메시지)
//! - [`sse_source`]: SSE 단일 메트릭 스트림 (`{"metric": ...}`)
//! - [`runner`]: 스트림 공통 재연결 루프
//! - [`dashboard_poller`]: 원격 허브 조회 + [`change_detector`] 변경 감지

pub mod change_detector;
pub mod connector;
pub mod dashboard_poller;
pub mod poll_source;
pub mod reconnect;
pub mod runner;
pub mod sse_source;
pub mod ws_source;

pub use dashboard_poller::DashboardPoller;
pub use poll_source::PollSource;
pub use reconnect::ReconnectPolicy;
pub use sse_source::connect_stream;
pub use ws_source::stream_source;
