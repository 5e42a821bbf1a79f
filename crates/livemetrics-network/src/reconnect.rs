//! 스트림 재연결 정책.

use livemetrics_core::config::ReconnectConfig;
use rand::Rng;
use std::time::Duration;

/// 재연결 정책
///
/// 기본값은 고정 5초 지연, 지터 없음, 무제한 재시도.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// 기본 대기 시간
    pub delay: Duration,
    /// 대기 시간에 더해지는 최대 무작위 지연
    pub jitter: Duration,
    /// 연속 실패 허용 횟수 (None이면 무제한)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            jitter: Duration::ZERO,
            max_attempts: None,
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl ReconnectPolicy {
    /// 고정 지연 정책
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// 다음 재연결까지 대기 시간
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max_ms);
        self.delay + Duration::from_millis(extra)
    }

    /// `failures`번 연속 실패한 뒤에도 재시도할지 여부
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_attempts.map_or(true, |max| failures <= max)
    }
}
