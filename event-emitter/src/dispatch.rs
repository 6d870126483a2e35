//! 发射与分发（dispatch）
//!
//! 一次 `emit` 的流程：
//! 1. 在注册表锁内取得命中监听器的快照，随即释放锁；
//! 2. 按注册顺序逐个调用（通配注册的监听器参数前追加具体事件名）；
//! 3. 同步失败立即记录并通知错误观察者，不影响后续监听器；
//! 4. 延迟结果先全部收集，再统一等待全部完成，任何一个失败都不会取消其它；
//!    失败按完成顺序记录并通知观察者；
//! 5. 汇总为 `EmitResult`。没有延迟结果时 `Emission` 立即就绪。
//!
use crate::emitter::Shared;
use crate::error::{EmitterError, EmitterResult, InvocationMode, ListenerFailure};
use crate::listener::{Listener, ListenerFuture, ListenerOutput};
use crate::observer;
use futures_core::future::BoxFuture;
use futures_util::future::{self, Either, Ready};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// 一次发射的汇总结果
#[derive(Debug)]
pub struct EmitResult {
    event: String,
    errors: Vec<ListenerFailure>,
}

impl EmitResult {
    fn new(event: &str, errors: Vec<ListenerFailure>) -> Self {
        Self {
            event: event.to_string(),
            errors,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// 没有任何监听器失败
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// 按观察到的顺序排列的失败；成功时为空
    pub fn errors(&self) -> &[ListenerFailure] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ListenerFailure> {
        self.errors
    }

    /// 转换为 `Result`，便于调用方使用 `?`
    pub fn into_result(self) -> EmitterResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(EmitterError::Emit {
                event: self.event,
                failures: self.errors,
            })
        }
    }
}

/// `emit` 的返回值：总是一个 future
///
/// 没有监听器返回延迟结果时立即就绪，可通过 `now` 同步取出结果；
/// 这只是优化，与等待它得到的结果没有语义差别。
#[must_use = "an Emission does nothing with deferred listeners unless awaited"]
pub struct Emission {
    inner: Either<Ready<EmitResult>, BoxFuture<'static, EmitResult>>,
}

impl Emission {
    fn ready(result: EmitResult) -> Self {
        Self {
            inner: Either::Left(future::ready(result)),
        }
    }

    fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = EmitResult> + Send + 'static,
    {
        Self {
            inner: Either::Right(Box::pin(fut)),
        }
    }

    /// 是否无需等待即可取得结果
    pub fn is_immediate(&self) -> bool {
        matches!(self.inner, Either::Left(_))
    }

    /// 立即取出结果；仍有延迟结果未完成时原样返回
    pub fn now(self) -> Result<EmitResult, Emission> {
        match self.inner {
            Either::Left(ready) => Ok(ready.into_inner()),
            pending => Err(Emission { inner: pending }),
        }
    }
}

impl Future for Emission {
    type Output = EmitResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emission")
            .field("immediate", &self.is_immediate())
            .finish()
    }
}

pub(crate) fn dispatch(shared: &Arc<Shared>, event: &str, args: Vec<Value>) -> Emission {
    let matched = shared.registry.lock().matching(event);
    if matched.is_empty() {
        tracing::trace!(event, "no matching listeners");
        return Emission::ready(EmitResult::new(event, Vec::new()));
    }
    tracing::debug!(event, listeners = matched.len(), "emit");

    let catch_panics = shared.config.catch_panics;
    let mut errors = Vec::new();
    let mut pending = FuturesUnordered::new();
    // 通配监听器的参数（事件名 + 载荷），首次需要时构造
    let mut pattern_args: Option<Vec<Value>> = None;

    for m in matched {
        let call_args = if m.wildcard {
            pattern_args
                .get_or_insert_with(|| with_event(event, &args))
                .as_slice()
        } else {
            args.as_slice()
        };

        match invoke(&m.listener, call_args, catch_panics) {
            Ok(ListenerOutput::Done) => {}
            Ok(ListenerOutput::Deferred(fut)) => {
                let fut = if catch_panics { guard(fut) } else { fut };
                let (key, id) = (m.key, m.id);
                pending.push(async move { (key, id, fut.await) });
            }
            Err(error) => {
                let failure =
                    ListenerFailure::new(event, &m.key, m.id, InvocationMode::Sync, error);
                report(shared, failure, &mut errors);
            }
        }
    }

    if pending.is_empty() {
        return Emission::ready(EmitResult::new(event, errors));
    }

    let shared = shared.clone();
    let event = event.to_string();
    Emission::pending(async move {
        while let Some((key, id, outcome)) = pending.next().await {
            if let Err(error) = outcome {
                let failure =
                    ListenerFailure::new(&event, &key, id, InvocationMode::Deferred, error);
                report(&shared, failure, &mut errors);
            }
        }
        EmitResult::new(&event, errors)
    })
}

fn with_event(event: &str, args: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(args.len() + 1);
    out.push(Value::String(event.to_string()));
    out.extend(args.iter().cloned());
    out
}

fn invoke(
    listener: &Listener,
    args: &[Value],
    catch_panics: bool,
) -> anyhow::Result<ListenerOutput> {
    if !catch_panics {
        return listener.call(args);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| listener.call(args))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(panic_error(payload)),
    }
}

fn guard(fut: ListenerFuture) -> ListenerFuture {
    Box::pin(
        AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|r| r.unwrap_or_else(|payload| Err(panic_error(payload)))),
    )
}

fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    anyhow::anyhow!("listener panicked: {msg}")
}

/// 记录失败：写日志、同步通知观察者、追加到结果
fn report(shared: &Shared, failure: ListenerFailure, errors: &mut Vec<ListenerFailure>) {
    tracing::warn!(
        event = failure.event(),
        key = failure.key(),
        listener = %failure.listener_id(),
        mode = %failure.mode(),
        error = %failure.error(),
        "listener failed"
    );
    let observers = shared.observers.lock().snapshot();
    if shared.config.catch_panics {
        // 观察者 panic 不能吞掉已经汇总的失败，也不能跳过其余观察者
        for callback in &observers {
            let notified =
                panic::catch_unwind(AssertUnwindSafe(|| callback(failure.event(), &failure)));
            if let Err(payload) = notified {
                tracing::error!(
                    event = failure.event(),
                    error = %panic_error(payload),
                    "error observer panicked"
                );
            }
        }
    } else {
        observer::notify(&observers, &failure);
    }
    errors.push(failure);
}
