//! 事件发射器统一错误定义
//!
//! - `EmitterError`：发射器自身的错误（模式编译失败、聚合后的发射失败）；
//! - `ListenerFailure`：单次监听器调用失败（同步返回错误、延迟结果失败或 panic）。
//!
//! 监听器失败永远不会让 `emit` 本身失败，而是作为数据收集进 `EmitResult`，
//! 需要 `?` 风格时可通过 `EmitResult::into_result` 转换为 `EmitterError`。
//!
use crate::listener::ListenerId;
use std::fmt;
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("invalid pattern: pattern={pattern}, reason={reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("emit failed: event={event}, failures={}", failures.len())]
    Emit {
        event: String,
        failures: Vec<ListenerFailure>,
    },
}

/// 统一 Result 类型别名
pub type EmitterResult<T> = Result<T, EmitterError>;

impl EmitterError {
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl fmt::Display) -> Self {
        EmitterError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// 监听器的调用方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationMode {
    /// 调用时同步返回了错误（或 panic）
    Sync,
    /// 返回的延迟结果最终失败
    Deferred,
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationMode::Sync => f.write_str("sync"),
            InvocationMode::Deferred => f.write_str("deferred"),
        }
    }
}

/// 一次监听器调用失败
///
/// 同时携带触发事件名、命中的注册键与监听器句柄，便于观察者定位来源。
#[derive(Debug, Error)]
#[error("listener failed: event={event}, key={key}, listener={listener_id}, mode={mode}, reason={source}")]
pub struct ListenerFailure {
    event: String,
    key: String,
    listener_id: ListenerId,
    mode: InvocationMode,
    #[source]
    source: anyhow::Error,
}

impl ListenerFailure {
    pub(crate) fn new(
        event: &str,
        key: &str,
        listener_id: ListenerId,
        mode: InvocationMode,
        source: anyhow::Error,
    ) -> Self {
        Self {
            event: event.to_string(),
            key: key.to_string(),
            listener_id,
            mode,
            source,
        }
    }

    /// 触发失败的事件名（发射时的具体名称）
    pub fn event(&self) -> &str {
        &self.event
    }

    /// 命中的注册键（精确名或通配模式）
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    /// 监听器产生的原始错误
    pub fn error(&self) -> &anyhow::Error {
        &self.source
    }

    pub fn into_error(self) -> anyhow::Error {
        self.source
    }
}
