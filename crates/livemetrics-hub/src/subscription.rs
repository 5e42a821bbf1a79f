//! 구독 허브.
//!
//! 세 개의 독립 채널(집계, 이벤트, 사용자 메트릭)에 리스너를 등록하고 발행한다.
//!
//! ## 계약
//! - `publish`는 호출 시점에 등록된 해당 채널의 리스너를 모두 동기 호출한다. 순서는 보장하지 않는다.
//! - 리스너가 `Err`를 반환하거나 패닉해도 나머지 리스너는 계속 호출된다.
//! - 리스너 호출 중에는 허브 내부 락을 잡지 않는다. 리스너 안에서 구독/해지해도 된다.
//! - 발행당 최대 1회 전달. 실패한 전달을 재시도하지 않는다.

use livemetrics_core::error::CoreError;
use livemetrics_core::models::aggregate::AggregatedMetrics;
use livemetrics_core::models::event::RealtimeEvent;
use livemetrics_core::models::metric::UserMetric;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 알림 채널
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 집계 스냅샷 갱신
    Aggregates,
    /// 개별 활동 이벤트
    Events,
    /// 사용자 메트릭 원본 갱신
    UserMetrics,
}

/// 허브가 발행하는 알림
#[derive(Debug, Clone)]
pub enum HubEvent {
    Aggregates(AggregatedMetrics),
    Event(RealtimeEvent),
    /// 이번 쓰기로 갱신된 레코드들
    UserMetrics(Vec<UserMetric>),
}

impl HubEvent {
    /// 이 알림이 속한 채널
    pub fn channel(&self) -> Channel {
        match self {
            HubEvent::Aggregates(_) => Channel::Aggregates,
            HubEvent::Event(_) => Channel::Events,
            HubEvent::UserMetrics(_) => Channel::UserMetrics,
        }
    }
}

/// 리스너 함수
pub type Listener = Arc<dyn Fn(&HubEvent) -> Result<(), CoreError> + Send + Sync>;

/// 한 번의 발행 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    failures: AtomicU64,
    listeners: RwLock<HashMap<Channel, Vec<(u64, Listener)>>>,
}

impl Registry {
    fn remove(&self, channel: Channel, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let Some(entries) = listeners.get_mut(&channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        before != entries.len()
    }
}

/// 채널별 리스너 레지스트리
///
/// 복제해도 같은 레지스트리를 공유한다.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    registry: Arc<Registry>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너 등록. 반환된 핸들로 해지한다.
    ///
    /// 핸들을 버려도 구독은 유지된다.
    pub fn subscribe<F>(&self, channel: Channel, listener: F) -> Subscription
    where
        F: Fn(&HubEvent) -> Result<(), CoreError> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .write()
            .entry(channel)
            .or_default()
            .push((id, Arc::new(listener)));

        debug!("구독 등록: {:?} #{}", channel, id);
        Subscription {
            id,
            channel,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// 큐 기반 구독
    ///
    /// 큐가 가득 차면 해당 알림은 이 구독자에게만 유실된다.
    pub fn subscribe_queue(
        &self,
        channel: Channel,
        capacity: usize,
    ) -> (Subscription, mpsc::Receiver<HubEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let subscription = self.subscribe(channel, move |event| {
            tx.try_send(event.clone())
                .map_err(|e| CoreError::Internal(format!("구독 큐 전달 실패: {e}")))
        });
        (subscription, rx)
    }

    /// 알림 발행
    pub fn publish(&self, event: HubEvent) -> DeliveryReport {
        let channel = event.channel();
        let listeners: Vec<Listener> = self
            .registry
            .listeners
            .read()
            .get(&channel)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        let mut report = DeliveryReport::default();
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("리스너 실패 ({:?}): {e}", channel);
                    report.failed += 1;
                }
                Err(_) => {
                    warn!("리스너 패닉 ({:?})", channel);
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            self.registry
                .failures
                .fetch_add(report.failed as u64, Ordering::Relaxed);
        }
        report
    }

    /// 채널별 현재 리스너 수
    pub fn listener_count(&self, channel: Channel) -> usize {
        self.registry
            .listeners
            .read()
            .get(&channel)
            .map_or(0, Vec::len)
    }

    /// 누적 리스너 실패 횟수
    pub fn failure_count(&self) -> u64 {
        self.registry.failures.load(Ordering::Relaxed)
    }
}

/// 구독 핸들
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    channel: Channel,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// 구독 해지. 이미 해지되었거나 허브가 사라졌으면 false.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => {
                let removed = registry.remove(self.channel, self.id);
                debug!("구독 해지: {:?} #{}", self.channel, self.id);
                removed
            }
            None => false,
        }
    }
}
