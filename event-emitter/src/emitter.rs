//! 事件发射器（EventEmitter）
//!
//! 对外的统一入口，组合注册表、匹配器、分发器与错误观察者：
//! - `on` / `once` / `once_n`：注册监听器（精确名或通配模式），返回句柄；
//! - `off` / `clear` / `reset`：移除监听器、整个键或全部状态；
//! - `emit`：触发所有命中的监听器并汇总结果；
//! - `on_error`：订阅所有监听器失败。
//!
//! `EventEmitter` 是共享状态上的轻量句柄，克隆后指向同一个发射器。
//! 调用监听器与观察者时不持有任何锁，因此监听器内部可以重入发射器。
//!
use crate::args::{self, EmitArg};
use crate::config::EmitterConfig;
use crate::dispatch::{self, Emission};
use crate::error::ListenerFailure;
use crate::listener::{Listener, ListenerId};
use crate::observer::{ErrorObservers, ObserverId};
use crate::once;
use crate::registry::Registry;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub(crate) struct Shared {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) observers: Mutex<ErrorObservers>,
    pub(crate) config: EmitterConfig,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::with_config(EmitterConfig::default())
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::new(config.max_listeners)),
                observers: Mutex::new(ErrorObservers::default()),
                config,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.shared.config
    }

    fn next_id(&self) -> ListenerId {
        ListenerId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// 注册监听器；键包含 `*` 时作为通配模式
    pub fn on(&self, key: &str, listener: Listener) -> ListenerId {
        let id = self.next_id();
        self.register(key, id, listener);
        id
    }

    /// 注册只触发一次的监听器
    pub fn once(&self, key: &str, listener: Listener) -> ListenerId {
        self.once_n(key, listener, 1)
    }

    /// 注册最多触发 `max_emits` 次的监听器（每次命中的 `emit` 计一次）
    ///
    /// 返回的句柄指向包装器，可用 `off` 提前取消。
    pub fn once_n(&self, key: &str, listener: Listener, max_emits: usize) -> ListenerId {
        let id = self.next_id();
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let owner = key.to_string();

        let wrapper = once::limited(listener, max_emits, move || {
            if let Some(shared) = weak.upgrade() {
                shared.registry.lock().remove_listener(&owner, id);
            }
        });
        self.register(key, id, wrapper);
        id
    }

    fn register(&self, key: &str, id: ListenerId, listener: Listener) {
        let count = self.shared.registry.lock().insert(key, id, listener);
        tracing::trace!(key, listener = %id, count, "listener registered");
    }

    /// 移除监听器：`None` 删除整个键，`Some(id)` 只删除对应句柄
    ///
    /// 键按注册时的原始字符串匹配；未知的键或句柄静默忽略。
    pub fn off(&self, key: &str, listener: Option<ListenerId>) {
        let mut registry = self.shared.registry.lock();
        match listener {
            None => {
                let removed = registry.remove_key(key);
                tracing::trace!(key, removed, "key removed");
            }
            Some(id) => {
                let removed = registry.remove_listener(key, id);
                tracing::trace!(key, listener = %id, removed, "listener removed");
            }
        }
    }

    /// 清空某个键，或在 `None` 时清空全部键；错误观察者不受影响
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => self.off(key, None),
            None => {
                self.shared.registry.lock().clear();
                tracing::trace!("registry cleared");
            }
        }
    }

    /// 全局重置：清空注册表与错误观察者
    pub fn reset(&self) {
        self.shared.registry.lock().clear();
        self.shared.observers.lock().clear();
        tracing::trace!("emitter reset");
    }

    /// 触发事件
    ///
    /// 惰性参数在任何监听器执行前统一求值一次。返回的 `Emission` 在没有
    /// 延迟结果时立即就绪，否则在全部延迟结果完成后就绪。
    ///
    /// 同步监听器在本调用返回前已全部执行；延迟结果只在 `Emission` 被轮询时
    /// 才开始执行。丢弃未完成的 `Emission` 会丢弃这些延迟结果，它们的失败也
    /// 不会通知错误观察者。需要“发出即不管”时，把 `Emission` 交给
    /// `tokio::spawn` 之类的执行器。
    ///
    /// 开启 `catch_panics` 时，错误观察者的 panic 会被捕获并记录日志，不影响
    /// 本次发射的结果。
    pub fn emit<I>(&self, event: &str, args: I) -> Emission
    where
        I: IntoIterator,
        I::Item: Into<EmitArg>,
    {
        let args = args::resolve_all(args);
        dispatch::dispatch(&self.shared, event, args)
    }

    /// 无载荷触发事件
    pub fn emit_empty(&self, event: &str) -> Emission {
        self.emit(event, std::iter::empty::<Value>())
    }

    /// 订阅所有监听器失败
    pub fn on_error<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&str, &ListenerFailure) + Send + Sync + 'static,
    {
        self.shared.observers.lock().push(observer)
    }

    pub fn off_error(&self, id: ObserverId) -> bool {
        self.shared.observers.lock().remove(id)
    }

    /// 某个注册键下的监听器（按注册顺序）
    pub fn listeners(&self, key: &str) -> Vec<Listener> {
        self.shared.registry.lock().listeners_for(key)
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.shared.registry.lock().listener_count(key)
    }

    /// 所有注册键（按注册顺序）
    pub fn event_names(&self) -> Vec<String> {
        self.shared.registry.lock().keys()
    }

    /// 是否有任何注册键命中该事件名
    pub fn has_listeners(&self, event: &str) -> bool {
        self.shared.registry.lock().has_match(event)
    }

    /// 发射该事件时将被调用的监听器（按调用顺序）
    pub fn matching_listeners(&self, event: &str) -> Vec<Listener> {
        self.shared
            .registry
            .lock()
            .matching(event)
            .into_iter()
            .map(|m| m.listener)
            .collect()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("keys", &self.shared.registry.lock().len())
            .field("observers", &self.shared.observers.lock().len())
            .field("config", &self.shared.config)
            .finish()
    }
}
