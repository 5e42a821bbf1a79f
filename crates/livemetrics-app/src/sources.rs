//! 수집 소스 배선.
//!
//! 설정에 나열된 폴링/WebSocket/SSE 소스와 원격 대시보드 폴러를
//! 허브 종료 신호에 묶어 기동한다.

use livemetrics_core::config::AppConfig;
use livemetrics_hub::LiveMetricsHub;
use livemetrics_network::runner::{shutdown_requested, StreamExit};
use livemetrics_network::{connect_stream, stream_source, DashboardPoller, PollSource, ReconnectPolicy};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 설정의 모든 수집 소스를 허브 작업으로 등록
///
/// 잘못된 소스 설정은 로그만 남기고 건너뛴다. 등록된 작업 수를 반환한다.
pub fn spawn_sources(hub: &LiveMetricsHub, config: &AppConfig) -> usize {
    let mut spawned = 0;

    for poll in &config.sources.poll {
        match PollSource::from_config(poll, hub.sink()) {
            Ok(source) => {
                hub.attach(format!("poll:{}", poll.url), move |rx| source.run(rx));
                spawned += 1;
            }
            Err(e) => error!("폴링 소스 생성 실패 ({}): {e}", poll.url),
        }
    }

    for url in &config.sources.streams {
        let url = url.clone();
        let sink = hub.sink();
        let policy = ReconnectPolicy::from(&config.reconnect);
        hub.attach(format!("ws:{url}"), move |rx| async move {
            log_exit(&url, stream_source(&url, sink, policy, rx).await);
        });
        spawned += 1;
    }

    for url in &config.sources.sse {
        let url = url.clone();
        let sink = hub.sink();
        let policy = ReconnectPolicy::from(&config.reconnect);
        hub.attach(format!("sse:{url}"), move |rx| async move {
            log_exit(&url, connect_stream(&url, sink, policy, rx).await);
        });
        spawned += 1;
    }

    if let Some(dashboard) = &config.dashboard {
        match DashboardPoller::from_config(dashboard) {
            Ok(poller) => {
                let poller = Arc::new(poller);
                let mut updates = poller.subscribe();
                hub.attach(format!("dashboard:{}", dashboard.base_url), move |rx| {
                    poller.run(rx)
                });
                hub.attach("dashboard-watch", move |mut rx| async move {
                    loop {
                        tokio::select! {
                            changed = updates.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                                let latest = updates.borrow_and_update().clone();
                                if let Some(snapshot) = latest {
                                    info!(
                                        "원격 대시보드 갱신: 사용자 {}, 활성 {}, 이벤트 {}",
                                        snapshot.aggregated_metrics.total_users,
                                        snapshot.aggregated_metrics.active_users,
                                        snapshot.aggregated_metrics.total_events
                                    );
                                }
                            }
                            _ = shutdown_requested(&mut rx) => break,
                        }
                    }
                });
                spawned += 2;
            }
            Err(e) => error!("대시보드 폴러 생성 실패 ({}): {e}", dashboard.base_url),
        }
    }

    info!("수집 소스 {}개 작업 등록", spawned);
    spawned
}

fn log_exit(url: &str, result: Result<StreamExit, livemetrics_core::error::CoreError>) {
    match result {
        Ok(StreamExit::Shutdown) => info!("스트림 종료: {url}"),
        Ok(StreamExit::RetriesExhausted) => warn!("재연결 한도 초과, 스트림 포기: {url}"),
        Err(e) => error!("스트림 시작 실패 ({url}): {e}"),
    }
}
