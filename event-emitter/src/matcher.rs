//! 注册键匹配（KeyMatcher）
//!
//! 注册键在创建时一次性判定为两种形态之一：
//! - `Exact`：与事件名逐字符相等才匹配；
//! - `Wildcard`：包含 `*`，编译为锚定首尾的正则，`*` 匹配任意字符序列
//!   （可跨越 `:`、`.` 等分隔符）。
//!
//! 模式中的其余字符一律按字面量转义，不会被当作正则元字符。
//!
use crate::error::{EmitterError, EmitterResult};
use regex::Regex;

pub const WILDCARD: char = '*';

#[derive(Clone, Debug)]
pub enum KeyMatcher {
    Exact(String),
    Wildcard { pattern: String, regex: Regex },
}

impl KeyMatcher {
    /// 按键的内容判定形态，通配键同时完成编译
    pub fn parse(key: &str) -> EmitterResult<Self> {
        if is_pattern(key) {
            Ok(KeyMatcher::Wildcard {
                pattern: key.to_string(),
                regex: compile_pattern(key)?,
            })
        } else {
            Ok(KeyMatcher::Exact(key.to_string()))
        }
    }

    /// 同 `parse`，但模式被拒绝时记录告警并退化为精确键
    pub fn parse_or_exact(key: &str) -> Self {
        Self::parse(key).unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "pattern rejected, registering as exact key");
            KeyMatcher::Exact(key.to_string())
        })
    }

    /// 原始注册键
    pub fn key(&self) -> &str {
        match self {
            KeyMatcher::Exact(key) => key,
            KeyMatcher::Wildcard { pattern, .. } => pattern,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeyMatcher::Wildcard { .. })
    }

    pub fn matches(&self, event: &str) -> bool {
        match self {
            KeyMatcher::Exact(key) => key == event,
            KeyMatcher::Wildcard { regex, .. } => regex.is_match(event),
        }
    }
}

pub fn is_pattern(key: &str) -> bool {
    key.contains(WILDCARD)
}

/// 将通配模式编译为正则：字面片段转义，`*` 替换为 `.*`，整体锚定
pub fn compile_pattern(pattern: &str) -> EmitterResult<Regex> {
    let body = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("(?s)^{body}$")).map_err(|e| EmitterError::invalid_pattern(pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(key: &str) -> KeyMatcher {
        KeyMatcher::parse(key).unwrap()
    }

    #[test]
    fn exact_keys_match_only_themselves() {
        let m = matcher("user:login");
        assert!(!m.is_wildcard());
        assert!(m.matches("user:login"));
        assert!(!m.matches("user:login:extra"));
        assert!(!m.matches("user:logi"));
    }

    #[test]
    fn wildcard_crosses_delimiters() {
        let m = matcher("user:*");
        assert!(m.is_wildcard());
        assert_eq!(m.key(), "user:*");
        assert!(m.matches("user:login"));
        assert!(m.matches("user:login:extra"));
        assert!(m.matches("user:"));
        assert!(!m.matches("admin:user:login"));
    }

    #[test]
    fn wildcard_in_the_middle_and_alone() {
        let m = matcher("order.*.paid");
        assert!(m.matches("order.42.paid"));
        assert!(m.matches("order.a.b.paid"));
        assert!(!m.matches("order.42.refunded"));

        let all = matcher("*");
        assert!(all.matches(""));
        assert!(all.matches("anything:at.all"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let m = matcher("a.b+(c)*");
        assert!(m.matches("a.b+(c)xyz"));
        assert!(!m.matches("aXb+(c)xyz"));
        assert!(!m.matches("a.bb(c)"));

        let exact = matcher("price.$[0]");
        assert!(exact.matches("price.$[0]"));
        assert!(!exact.matches("price.x[0]"));
    }

    #[test]
    fn compiled_pattern_is_anchored() {
        let re = compile_pattern("job:*:done").unwrap();
        assert_eq!(re.as_str(), "(?s)^job:.*:done$");
    }
}
