//! 有限次监听器包装（once / once_n）
//!
//! 包装器代替原始监听器注册进注册表，内部维护两个计数：
//! 1. `claimed`：调用原始监听器前先用 CAS 占用一个名额，占不到就不调用；
//! 2. `completed`：同步调用成功后加一，达到上限时把自己从注册表中摘除。
//!
//! 先占名额再调用，重入发射或多线程并发发射都不会超额调用原始监听器。
//! 计数只在同步返回时确认，与延迟结果何时完成无关；同步失败（或 panic）归还名额。
//!
use crate::listener::{Listener, ListenerOutput};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Limited<D> {
    inner: Listener,
    max_emits: usize,
    claimed: AtomicUsize,
    completed: AtomicUsize,
    detach: D,
}

/// 已占用的名额；未确认就被丢弃（同步失败或 panic 展开）时归还
struct Claim<'a> {
    slots: &'a AtomicUsize,
    kept: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.slots.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl<D> Limited<D>
where
    D: Fn() + Send + Sync,
{
    fn claim(&self) -> Option<Claim<'_>> {
        self.claimed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c < self.max_emits).then_some(c + 1)
            })
            .ok()
            .map(|_| Claim {
                slots: &self.claimed,
                kept: false,
            })
    }

    fn invoke(&self, args: &[Value]) -> anyhow::Result<ListenerOutput> {
        let Some(mut claim) = self.claim() else {
            // 名额可能只是被进行中的调用占用，它失败时还会归还
            if self.completed.load(Ordering::Acquire) >= self.max_emits {
                (self.detach)();
            }
            return Ok(ListenerOutput::Done);
        };

        let outcome = self.inner.call(args);
        if outcome.is_ok() {
            claim.kept = true;
            let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
            if done >= self.max_emits {
                (self.detach)();
            }
        }
        outcome
    }
}

/// 构造最多触发 `max_emits` 次的包装监听器，`detach` 负责从注册表摘除包装器本身
pub(crate) fn limited<D>(inner: Listener, max_emits: usize, detach: D) -> Listener
where
    D: Fn() + Send + Sync + 'static,
{
    let state = Arc::new(Limited {
        inner,
        max_emits,
        claimed: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
        detach,
    });
    Listener::new(move |args| state.invoke(args))
}
