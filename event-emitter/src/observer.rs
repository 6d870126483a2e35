//! 错误观察者（ErrorObservers）
//!
//! 独立于注册表的旁路通道：任意事件的任意监听器调用失败（同步或延迟），
//! 都会以 `(事件名, 失败)` 同步通知每一个观察者，每次失败通知一次。
//! 只有 `reset` 或 `off_error` 会移除观察者，`clear` 不会。
//!
use crate::error::ListenerFailure;
use std::fmt;
use std::sync::Arc;

pub type ErrorObserverFn = dyn Fn(&str, &ListenerFailure) + Send + Sync;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
pub struct ErrorObservers {
    entries: Vec<(ObserverId, Arc<ErrorObserverFn>)>,
    next_id: u64,
}

impl ErrorObservers {
    pub fn push<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&str, &ListenerFailure) + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, Arc::new(observer)));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(oid, _)| *oid != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 当前观察者快照；通知期间不持有锁，观察者可以重入发射器
    pub fn snapshot(&self) -> Vec<Arc<ErrorObserverFn>> {
        self.entries.iter().map(|(_, o)| o.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ErrorObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorObservers")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// 按注册顺序逐个通知
pub fn notify(observers: &[Arc<ErrorObserverFn>], failure: &ListenerFailure) {
    for observer in observers {
        observer(failure.event(), failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationMode;
    use crate::listener::ListenerId;
    use std::sync::Mutex;

    #[test]
    fn notifies_in_order_and_supports_removal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut observers = ErrorObservers::default();

        let l1 = log.clone();
        let first = observers.push(move |event, f| {
            l1.lock().unwrap().push(format!("1:{event}:{}", f.error()));
        });
        let l2 = log.clone();
        observers.push(move |event, f| {
            l2.lock().unwrap().push(format!("2:{event}:{}", f.error()));
        });

        let failure = ListenerFailure::new(
            "job:done",
            "job:*",
            ListenerId::new(1),
            InvocationMode::Sync,
            anyhow::anyhow!("Err1"),
        );
        notify(&observers.snapshot(), &failure);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["1:job:done:Err1", "2:job:done:Err1"]
        );

        assert!(observers.remove(first));
        assert!(!observers.remove(first));
        assert_eq!(observers.len(), 1);
        observers.clear();
        assert!(observers.is_empty());
    }
}
