//! 스트림 재연결 루프.
//!
//! 연결 → 프레임 수신 → 끊김 → 정책 지연 → 재연결을 종료 신호가 올 때까지 반복한다.
//! 프레임 처리 실패는 핸들러 책임이며 연결을 끊지 않는다.

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::connector::FrameConnector;
use crate::reconnect::ReconnectPolicy;

/// 스트림 루프 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    /// 종료 신호 수신
    Shutdown,
    /// 재연결 한도 초과
    RetriesExhausted,
}

/// 종료 신호(`true`) 또는 송신측 해제까지 대기
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}

/// 재연결 루프 실행
///
/// 연결에 성공하면 연속 실패 횟수를 초기화한다.
pub async fn run_stream<C, H>(
    connector: &C,
    policy: &ReconnectPolicy,
    mut shutdown_rx: watch::Receiver<bool>,
    mut on_frame: H,
) -> StreamExit
where
    C: FrameConnector + ?Sized,
    H: FnMut(&str) + Send,
{
    let target = connector.target().to_string();
    let mut failures: u32 = 0;

    loop {
        let connected = tokio::select! {
            result = connector.connect() => result,
            _ = shutdown_requested(&mut shutdown_rx) => return StreamExit::Shutdown,
        };

        match connected {
            Ok(mut frames) => {
                info!("스트림 연결: {}", target);
                failures = 0;
                loop {
                    tokio::select! {
                        frame = frames.next() => match frame {
                            Some(Ok(text)) => on_frame(&text),
                            Some(Err(e)) => {
                                warn!("스트림 수신 에러 ({}): {e}", target);
                                break;
                            }
                            None => {
                                info!("스트림 종료: {}", target);
                                break;
                            }
                        },
                        _ = shutdown_requested(&mut shutdown_rx) => {
                            debug!("스트림 연결 해제: {}", target);
                            return StreamExit::Shutdown;
                        }
                    }
                }
            }
            Err(e) => warn!("스트림 연결 실패 ({}): {e}", target),
        }

        failures = failures.saturating_add(1);
        if !policy.should_retry(failures) {
            warn!("재연결 한도 초과, 포기: {} ({}회)", target, failures);
            return StreamExit::RetriesExhausted;
        }

        let delay = policy.next_delay();
        info!("{}ms 후 재연결: {}", delay.as_millis(), target);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_requested(&mut shutdown_rx) => return StreamExit::Shutdown,
        }
    }
}
