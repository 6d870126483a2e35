//! 监听器（Listener）
//!
//! 监听器是一个接收发射参数的可调用对象，返回值有两种形态：
//! - `ListenerOutput::Done`：同步完成；
//! - `ListenerOutput::Deferred`：延迟结果（future），由 `emit` 统一等待。
//!
//! 同步返回 `Err` 等价于“调用时抛出”，延迟结果的 `Err` 等价于“异步拒绝”。
//!
use async_trait::async_trait;
use futures_core::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 延迟结果
pub type ListenerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// 监听器一次调用的产出
pub enum ListenerOutput {
    Done,
    Deferred(ListenerFuture),
}

impl fmt::Debug for ListenerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerOutput::Done => f.write_str("Done"),
            ListenerOutput::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

type ListenerFn = dyn Fn(&[Value]) -> anyhow::Result<ListenerOutput> + Send + Sync;

/// 注册句柄：由 `on`/`once` 返回，`off` 按句柄精确移除
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 可克隆的监听器句柄
#[derive(Clone)]
pub struct Listener {
    f: Arc<ListenerFn>,
}

impl Listener {
    /// 以原始形态构造：调用方自行决定同步完成还是返回延迟结果
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<ListenerOutput> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// 同步监听器
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(move |args| f(args).map(|()| ListenerOutput::Done))
    }

    /// 异步监听器：每次调用产出一个延迟结果
    ///
    /// 参数在调用时借用，若 future 需要使用参数请在闭包内克隆。
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(move |args| Ok(ListenerOutput::Deferred(Box::pin(f(args)))))
    }

    /// 将实现了 `EventListener` 的处理器适配为监听器（总是产出延迟结果）
    pub fn handler<H>(handler: Arc<H>) -> Self
    where
        H: EventListener + ?Sized + 'static,
    {
        Self::new(move |args| {
            let handler = handler.clone();
            let args = args.to_vec();
            Ok(ListenerOutput::Deferred(Box::pin(async move {
                handler.handle(args).await
            })))
        })
    }

    /// 以给定参数调用监听器
    pub fn call(&self, args: &[Value]) -> anyhow::Result<ListenerOutput> {
        (self.f)(args)
    }

    /// 是否为同一个底层可调用对象
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// 面向对象风格的异步监听器
#[async_trait]
pub trait EventListener: Send + Sync {
    /// 监听器名称（用于日志与审计）
    fn listener_name(&self) -> &str;
    /// 处理一次事件；通配注册时第一个参数为具体事件名
    async fn handle(&self, args: Vec<Value>) -> anyhow::Result<()>;
}
