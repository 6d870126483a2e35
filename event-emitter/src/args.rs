//! 发射参数（EmitArg）
//!
//! 参数可以是立即值，也可以是惰性求值的可调用对象。惰性参数在一次 `emit`
//! 开始时统一求值一次，所有监听器看到的都是同一个结果。
//!
use serde_json::Value;
use std::fmt;

pub enum EmitArg {
    Value(Value),
    Lazy(Box<dyn FnOnce() -> Value + Send>),
}

impl EmitArg {
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        EmitArg::Lazy(Box::new(f))
    }

    pub(crate) fn resolve(self) -> Value {
        match self {
            EmitArg::Value(v) => v,
            EmitArg::Lazy(f) => f(),
        }
    }
}

impl From<Value> for EmitArg {
    fn from(value: Value) -> Self {
        EmitArg::Value(value)
    }
}

impl fmt::Debug for EmitArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitArg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            EmitArg::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// 将参数序列一次性求值为监听器可见的值
pub(crate) fn resolve_all<I>(args: I) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: Into<EmitArg>,
{
    args.into_iter().map(|a| a.into().resolve()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolves_lazy_args_in_place() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let args = vec![
            EmitArg::from(json!(1)),
            EmitArg::lazy(move || {
                c.fetch_add(1, Ordering::Relaxed);
                json!("computed")
            }),
            EmitArg::from(json!({"k": true})),
        ];

        let out = resolve_all(args);
        assert_eq!(out, vec![json!(1), json!("computed"), json!({"k": true})]);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn plain_values_convert() {
        let out = resolve_all([json!("a"), json!("b")]);
        assert_eq!(out, vec![json!("a"), json!("b")]);
    }
}
