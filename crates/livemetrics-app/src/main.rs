//! # livemetrics-app
//!
//! LiveMetrics 허브 바이너리 진입점.
//! 설정 로드, 허브 기동, 수집 소스 배선, 수집 서버 실행, 종료 처리.

mod lifecycle;
mod sources;

use anyhow::Result;
use clap::Parser;
use livemetrics_core::config::AppConfig;
use livemetrics_core::config_manager::ConfigManager;
use livemetrics_hub::LiveMetricsHub;
use livemetrics_web::WebServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

/// 수집 서버 종료 대기 한도
const WEB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// LiveMetrics 실시간 사용자 메트릭 허브
#[derive(Parser, Debug)]
#[command(name = "livemetrics")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 수집 서버 포트 (설정 파일 값보다 우선)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 수집 서버 없이 외부 소스만 수집
    #[arg(long)]
    no_web: bool,
}

/// 설정 로드. 실패하면 기본 설정으로 계속한다.
fn load_config(path: Option<PathBuf>) -> AppConfig {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    match manager {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        Err(e) => {
            warn!("설정 로드 실패, 기본값 사용: {e}");
            AppConfig::default_config()
        }
    }
}

/// CLI 인자를 설정에 반영
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if args.no_web {
        config.web.enabled = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "livemetrics={lvl},livemetrics_app={lvl},livemetrics_core={lvl},livemetrics_hub={lvl},livemetrics_network={lvl},livemetrics_web={lvl},tower_http={lvl}",
        lvl = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("LiveMetrics 허브 시작 (v{})", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.clone());
    apply_overrides(&mut config, &args);

    let lifecycle = LifecycleManager::new();

    let hub = Arc::new(LiveMetricsHub::new(config.hub.clone()));
    hub.start();

    sources::spawn_sources(&hub, &config);

    let web_handle = if config.web.enabled {
        let server = WebServer::new(hub.clone(), config.web.clone());
        info!("수집 서버: {}", server.url());
        let shutdown_rx = lifecycle.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!("수집 서버 에러: {e}");
            }
        }))
    } else {
        info!("수집 서버 비활성화");
        None
    };

    if let Err(e) = lifecycle.wait_for_signal().await {
        error!("시그널 대기 실패: {e}");
    }

    hub.stop().await;

    if let Some(handle) = web_handle {
        if tokio::time::timeout(WEB_SHUTDOWN_TIMEOUT, handle).await.is_err() {
            warn!("수집 서버 종료 대기 시간 초과");
        }
    }

    info!("LiveMetrics 허브 종료");
    Ok(())
}
