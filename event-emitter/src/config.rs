use bon::Builder;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// 发射器配置
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// 单个注册键的监听器数量告警阈值（疑似泄漏时输出 warn 日志），0 表示不限制
    #[builder(default = DEFAULT_MAX_LISTENERS)]
    pub max_listeners: usize,
    /// 是否将监听器 panic 捕获为调用失败
    #[builder(default = true)]
    pub catch_panics: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            catch_panics: true,
        }
    }
}
