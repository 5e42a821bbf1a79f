//! 라이프사이클 관리.
//!
//! 종료 신호 전파와 시그널 대기.

use tokio::sync::watch;
use tracing::info;

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// 종료 수신기 복제
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        self.shutdown_tx.send_replace(true);
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM) 후 종료 신호 발송
    ///
    /// 시그널 핸들러 등록에 실패해도 종료 신호는 보낸다.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        let result = Self::recv_signal().await;
        self.shutdown();
        result
    }

    #[cfg(unix)]
    async fn recv_signal() -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => info!("SIGINT 수신"),
            _ = sigterm.recv() => info!("SIGTERM 수신"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn recv_signal() -> std::io::Result<()> {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C 수신");
        Ok(())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
