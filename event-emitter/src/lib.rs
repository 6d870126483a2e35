//! 进程内事件发射器（event-emitter）
//!
//! 提供发布/订阅式的事件分发：调用方按事件名或通配模式注册监听器，
//! 随后触发事件，同步调用所有命中的监听器并汇总异步监听器的结果：
//! - 注册表（`registry`）：注册键到有序监听器序列的映射；
//! - 匹配器（`matcher`）：精确键与 `*` 通配模式的判定；
//! - 有限次监听器（`once`）：`once` / `once_n` 的包装实现；
//! - 分发器（`dispatch`）：同步/延迟混合调用与失败汇总；
//! - 错误观察者（`observer`）：所有监听器失败的旁路通知。
//!
//! 本 crate 面向单一逻辑线程与协作式异步完成，不做跨进程投递、持久化或重放。
//!
//! 典型用法：
//! ```rust
//! use event_emitter::{EventEmitter, Listener};
//! use serde_json::json;
//!
//! let emitter = EventEmitter::new();
//! emitter.on("user:*", Listener::sync(|args| {
//!     assert_eq!(args[0], json!("user:login"));
//!     Ok(())
//! }));
//!
//! let result = emitter.emit("user:login", [json!({"id": 1})]).now().unwrap();
//! assert!(result.is_success());
//! ```
//!
pub mod args;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod listener;
pub mod matcher;
pub mod observer;
mod once;
pub mod registry;

pub use args::EmitArg;
pub use config::EmitterConfig;
pub use dispatch::{EmitResult, Emission};
pub use emitter::EventEmitter;
pub use error::{EmitterError, EmitterResult, InvocationMode, ListenerFailure};
pub use listener::{EventListener, Listener, ListenerFuture, ListenerId, ListenerOutput};
pub use observer::ObserverId;
