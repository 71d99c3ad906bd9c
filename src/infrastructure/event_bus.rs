//! 事件总线 - 基础设施层
//!
//! 同步的进程内发布 / 订阅分发器：
//! - `emit` 按订阅顺序依次调用当前所有订阅者，全部完成后才返回
//! - 单个订阅者返回错误或 panic 只会被记录，不影响同一次分发中的其他订阅者，也不会传给调用方
//! - 同一线程上同名事件的嵌套深度有上限，超过后本次分发以 `ReentrancyError` 失败
//! - `emit_deferred` 把事件排进队列，由 `flush_deferred` 在当前这一轮处理结束后统一分发

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::ReentrancyError;
use crate::models::event::{Event, EventKind};
use crate::utils::truncate_text;

/// 事件处理器；返回 `Err` 等同于该订阅者“抛出”了错误
pub type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// 订阅凭据，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

/// 一次分发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub kind: EventKind,
    /// 成功执行的订阅者数量
    pub delivered: usize,
    /// 返回错误或 panic 的订阅者数量
    pub failed: usize,
}

/// 调试窗口中的一条记录
#[derive(Debug, Clone)]
pub struct EmittedRecord {
    pub seq: u64,
    pub kind: EventKind,
    pub summary: String,
    pub at: DateTime<Utc>,
}

const SUMMARY_MAX_LEN: usize = 120;

pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<Subscription>>>,
    depth: Mutex<HashMap<(ThreadId, EventKind), usize>>,
    deferred: Mutex<VecDeque<Event>>,
    recent: Mutex<VecDeque<EmittedRecord>>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    max_depth: usize,
    log_capacity: usize,
}

impl EventBus {
    pub fn new(max_depth: usize, log_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            depth: Mutex::new(HashMap::new()),
            deferred: Mutex::new(VecDeque::new()),
            recent: Mutex::new(VecDeque::with_capacity(log_capacity)),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(1),
            max_depth: max_depth.max(1),
            log_capacity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_reentrancy_depth, config.event_log_capacity)
    }

    /// 订阅事件，处理器按订阅顺序被调用
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers)
            .entry(kind)
            .or_default()
            .push(Subscription {
                id,
                handler: Arc::new(handler),
            });
        debug!("[事件总线] 订阅 {} (#{})", kind, id.0);
        id
    }

    /// 取消订阅，返回是否找到了该订阅
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&kind);
        }
        removed
    }

    /// 同步分发事件
    ///
    /// 处理器列表在分发前复制一份，因此处理器内部可以安全地订阅 / 取消订阅 / 再次 emit。
    pub fn emit(&self, event: impl Into<Event>) -> Result<DispatchReport, ReentrancyError> {
        let event = event.into();
        let kind = event.kind();
        self.record(&event);

        let _guard = self.enter(kind)?;

        let handlers: Vec<Handler> = lock(&self.subscribers)
            .get(&kind)
            .map(|list| list.iter().map(|s| s.handler.clone()).collect())
            .unwrap_or_default();

        let mut report = DispatchReport {
            kind,
            delivered: 0,
            failed: 0,
        };

        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    error!("[事件总线] {} 的第 {} 个订阅者处理失败: {:#}", kind, index + 1, e);
                    report.failed += 1;
                }
                Err(panic) => {
                    error!(
                        "[事件总线] {} 的第 {} 个订阅者 panic: {}",
                        kind,
                        index + 1,
                        panic_message(panic.as_ref())
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// 延迟分发：排队，等 `flush_deferred` 时再按先进先出顺序分发
    pub fn emit_deferred(&self, event: impl Into<Event>) {
        let event = event.into();
        debug!("[事件总线] 延迟分发 {}", event.kind());
        lock(&self.deferred).push_back(event);
    }

    /// 分发所有排队事件（包括分发过程中新排入的），返回分发数量
    pub fn flush_deferred(&self) -> usize {
        let mut flushed = 0;
        loop {
            let next = lock(&self.deferred).pop_front();
            let Some(event) = next else {
                break;
            };
            if let Err(e) = self.emit(event) {
                warn!("[事件总线] 延迟事件分发失败: {}", e);
            }
            flushed += 1;
        }
        flushed
    }

    pub fn pending_deferred(&self) -> usize {
        lock(&self.deferred).len()
    }

    /// 每个事件名当前的订阅者数量
    pub fn subscriber_counts(&self) -> BTreeMap<EventKind, usize> {
        lock(&self.subscribers)
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.subscribers).get(&kind).map_or(0, Vec::len)
    }

    /// 最近分发的事件（从旧到新）
    pub fn recent_events(&self) -> Vec<EmittedRecord> {
        lock(&self.recent).iter().cloned().collect()
    }

    fn record(&self, event: &Event) {
        if self.log_capacity == 0 {
            return;
        }
        let record = EmittedRecord {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            kind: event.kind(),
            summary: truncate_text(&event.summary(), SUMMARY_MAX_LEN),
            at: Utc::now(),
        };
        let mut recent = lock(&self.recent);
        while recent.len() >= self.log_capacity {
            recent.pop_front();
        }
        recent.push_back(record);
    }

    fn enter(&self, kind: EventKind) -> Result<DepthGuard<'_>, ReentrancyError> {
        let key = (std::thread::current().id(), kind);
        let mut depth = lock(&self.depth);
        let current = depth.entry(key).or_insert(0);
        if *current >= self.max_depth {
            let err = ReentrancyError {
                event: kind.to_string(),
                limit: self.max_depth,
            };
            error!("[事件总线] {}", err);
            return Err(err);
        }
        *current += 1;
        Ok(DepthGuard { bus: self, key })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct DepthGuard<'a> {
    bus: &'a EventBus,
    key: (ThreadId, EventKind),
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut depth = lock(&self.bus.depth);
        if let Some(current) = depth.get_mut(&self.key) {
            *current -= 1;
            if *current == 0 {
                depth.remove(&self.key);
            }
        }
    }
}

// 处理器 panic 时不持有锁，毒化的锁里的数据仍然一致
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
