//! 애플리케이션 설정 구조체.
//!
//! 집계 주기, 버퍼 용량, 재연결 정책, 수집 서버, 외부 수집 소스 등
//! 런타임 설정을 정의한다. [`crate::config_manager::ConfigManager`]를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 타이머 주기 하한. 0은 이 값으로 올린다.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 허브(저장소/집계) 설정
    #[serde(default)]
    pub hub: HubConfig,
    /// 스트림 재연결 정책
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// 수집 서버(HTTP/SSE/WebSocket) 설정
    #[serde(default)]
    pub web: WebConfig,
    /// 외부 수집 소스 목록
    #[serde(default)]
    pub sources: SourcesConfig,
    /// 원격 대시보드 폴러 (선택)
    #[serde(default)]
    pub dashboard: Option<DashboardConfig>,
}

// ============================================================
// 허브 설정
// ============================================================

/// 허브 설정. 집계 주기와 버퍼 용량
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// 집계 주기 (밀리초, 기본: 5000)
    #[serde(default = "default_aggregation_interval_ms")]
    pub aggregation_interval_ms: u64,
    /// 이벤트 로그 최대 보관 개수 (기본: 100)
    #[serde(default = "default_buffer_capacity")]
    pub event_log_capacity: usize,
    /// 시계열 최대 보관 포인트 수 (기본: 100)
    #[serde(default = "default_buffer_capacity")]
    pub time_series_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            aggregation_interval_ms: default_aggregation_interval_ms(),
            event_log_capacity: default_buffer_capacity(),
            time_series_capacity: default_buffer_capacity(),
        }
    }
}

impl HubConfig {
    /// 집계 주기
    pub fn aggregation_interval(&self) -> Duration {
        Duration::from_millis(self.aggregation_interval_ms).max(MIN_INTERVAL)
    }
}

// ============================================================
// 재연결 정책
// ============================================================

/// 스트림 재연결 설정
///
/// 기본값은 고정 5초 지연, 지터 없음, 무제한 재시도.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// 재연결 대기 시간 (밀리초)
    #[serde(default = "default_reconnect_delay_ms")]
    pub delay_ms: u64,
    /// 최대 지터 (밀리초, 0이면 비활성)
    #[serde(default)]
    pub jitter_ms: u64,
    /// 최대 재연결 시도 횟수 (None이면 무제한)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_reconnect_delay_ms(),
            jitter_ms: 0,
            max_attempts: None,
        }
    }
}

// ============================================================
// 수집 서버 설정
// ============================================================

/// 수집 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// 수집 서버 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 서버 포트 (기본: 3001)
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접근 허용 여부 (false: 127.0.0.1 only)
    #[serde(default)]
    pub allow_external: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_web_port(),
            allow_external: false,
        }
    }
}

// ============================================================
// 외부 수집 소스
// ============================================================

/// 외부 수집 소스 목록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// 주기적 폴링 소스
    #[serde(default)]
    pub poll: Vec<PollSourceConfig>,
    /// WebSocket 푸시 스트림 URL
    #[serde(default)]
    pub streams: Vec<String>,
    /// SSE 단일 메트릭 스트림 URL
    #[serde(default)]
    pub sse: Vec<String>,
}

/// 폴링 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSourceConfig {
    /// 조회 URL (`{metrics, events}` 응답)
    pub url: String,
    /// 폴링 간격 (밀리초, 기본: 5000)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl PollSourceConfig {
    /// 폴링 간격
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_INTERVAL)
    }
}

/// 원격 대시보드 폴러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// 원격 허브 기본 URL (`{base}/api/metrics/current` 조회)
    pub base_url: String,
    /// 폴링 간격 (밀리초, 기본: 5000)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl DashboardConfig {
    /// 폴링 간격
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_INTERVAL)
    }
}

fn default_true() -> bool {
    true
}

fn default_aggregation_interval_ms() -> u64 {
    5_000
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_web_port() -> u16 {
    3001
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            hub: HubConfig::default(),
            reconnect: ReconnectConfig::default(),
            web: WebConfig::default(),
            sources: SourcesConfig::default(),
            dashboard: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
