//! 监听器注册表（Registry）
//!
//! 维护“注册键 → 有序监听器序列”的映射：
//! - 键按首次注册的顺序保存，同一键的监听器按注册顺序保存；
//! - 重复注册同一键时追加，不会替换；
//! - 序列被清空时同时删除键及其编译好的匹配器，不留空条目。
//!
//! `matching` 返回一次发射的调用快照，之后对注册表的修改不影响该快照。
//!
use crate::listener::{Listener, ListenerId};
use crate::matcher::KeyMatcher;

#[derive(Clone, Debug)]
struct Registration {
    id: ListenerId,
    listener: Listener,
}

#[derive(Debug)]
struct Slot {
    matcher: KeyMatcher,
    entries: Vec<Registration>,
    warned: bool,
}

/// 一次匹配命中的监听器
#[derive(Clone, Debug)]
pub struct Matched {
    pub key: String,
    pub id: ListenerId,
    pub wildcard: bool,
    pub listener: Listener,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Slot>,
    /// 单个键的监听器数量告警阈值，0 表示不限制
    max_listeners: usize,
}

impl Registry {
    pub fn new(max_listeners: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_listeners,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.matcher.key() == key)
    }

    /// 追加监听器，键不存在时创建并编译匹配器；返回该键当前的监听器数量
    pub fn insert(&mut self, key: &str, id: ListenerId, listener: Listener) -> usize {
        let idx = match self.position(key) {
            Some(idx) => idx,
            None => {
                self.slots.push(Slot {
                    matcher: KeyMatcher::parse_or_exact(key),
                    entries: Vec::new(),
                    warned: false,
                });
                self.slots.len() - 1
            }
        };

        let max = self.max_listeners;
        let slot = &mut self.slots[idx];
        slot.entries.push(Registration { id, listener });

        let count = slot.entries.len();
        if max > 0 && count > max && !slot.warned {
            slot.warned = true;
            tracing::warn!(
                key = slot.matcher.key(),
                count,
                max_listeners = max,
                "possible listener leak: key has more listeners than max_listeners"
            );
        }
        count
    }

    /// 是否已存在该键
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// 删除整个键，返回被移除的监听器数量
    pub fn remove_key(&mut self, key: &str) -> usize {
        match self.position(key) {
            Some(idx) => self.slots.remove(idx).entries.len(),
            None => 0,
        }
    }

    /// 按句柄移除某个键下的监听器；键因此变空时一并删除
    pub fn remove_listener(&mut self, key: &str, id: ListenerId) -> bool {
        let Some(idx) = self.position(key) else {
            return false;
        };

        let slot = &mut self.slots[idx];
        let before = slot.entries.len();
        slot.entries.retain(|r| r.id != id);
        let removed = slot.entries.len() != before;

        if slot.entries.is_empty() {
            self.slots.remove(idx);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// 某个注册键下的监听器快照
    pub fn listeners_for(&self, key: &str) -> Vec<Listener> {
        self.position(key)
            .map(|idx| {
                self.slots[idx]
                    .entries
                    .iter()
                    .map(|r| r.listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.position(key)
            .map(|idx| self.slots[idx].entries.len())
            .unwrap_or(0)
    }

    /// 所有注册键（按注册顺序）
    pub fn keys(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|s| s.matcher.key().to_string())
            .collect()
    }

    /// 单次按注册顺序扫描所有键（精确键与通配键交错），收集命中的监听器
    pub fn matching(&self, event: &str) -> Vec<Matched> {
        self.slots
            .iter()
            .filter(|s| s.matcher.matches(event))
            .flat_map(|s| {
                let key = s.matcher.key();
                let wildcard = s.matcher.is_wildcard();
                s.entries.iter().map(move |r| Matched {
                    key: key.to_string(),
                    id: r.id,
                    wildcard,
                    listener: r.listener.clone(),
                })
            })
            .collect()
    }

    pub fn has_match(&self, event: &str) -> bool {
        self.slots.iter().any(|s| s.matcher.matches(event))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Listener::sync(|_| Ok(()))
    }

    fn insert(reg: &mut Registry, key: &str, raw: u64) -> ListenerId {
        let id = ListenerId::new(raw);
        reg.insert(key, id, noop());
        id
    }

    #[test]
    fn appends_under_existing_key() {
        let mut reg = Registry::new(0);
        insert(&mut reg, "a", 1);
        insert(&mut reg, "b", 2);
        insert(&mut reg, "a", 3);

        assert_eq!(reg.keys(), vec!["a", "b"]);
        assert_eq!(reg.listener_count("a"), 2);
        assert_eq!(reg.listener_count("b"), 1);
        assert_eq!(reg.listener_count("missing"), 0);
        assert!(reg.listeners_for("missing").is_empty());
    }

    #[test]
    fn matching_interleaves_keys_in_insertion_order() {
        let mut reg = Registry::new(0);
        insert(&mut reg, "user:*", 1);
        insert(&mut reg, "user:login", 2);
        insert(&mut reg, "*", 3);
        insert(&mut reg, "user:*", 4);
        insert(&mut reg, "other", 5);

        let ids: Vec<u64> = reg
            .matching("user:login")
            .iter()
            .map(|m| m.id.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 4, 2, 3]);

        let m = reg.matching("user:login");
        assert!(m[0].wildcard);
        assert_eq!(m[0].key, "user:*");
        assert!(!m[2].wildcard);
    }

    #[test]
    fn removing_last_listener_drops_the_key() {
        let mut reg = Registry::new(0);
        let a1 = insert(&mut reg, "a", 1);
        let a2 = insert(&mut reg, "a", 2);

        assert!(reg.remove_listener("a", a1));
        assert!(reg.contains_key("a"));
        assert!(!reg.remove_listener("a", a1));
        assert!(reg.remove_listener("a", a2));
        assert!(!reg.contains_key("a"));
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_is_keyed_by_registration_string() {
        let mut reg = Registry::new(0);
        let id = insert(&mut reg, "user:*", 1);

        // 具体事件名不是注册键，不会误删模式
        assert!(!reg.remove_listener("user:login", id));
        assert_eq!(reg.remove_key("user:login"), 0);
        assert!(reg.has_match("user:login"));

        assert_eq!(reg.remove_key("user:*"), 1);
        assert!(!reg.has_match("user:login"));
    }

    #[test]
    fn unknown_keys_are_noops() {
        let mut reg = Registry::new(0);
        assert_eq!(reg.remove_key("nope"), 0);
        assert!(!reg.remove_listener("nope", ListenerId::new(9)));
        reg.clear();
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut reg = Registry::new(0);
        insert(&mut reg, "e", 1);
        insert(&mut reg, "e", 2);

        let snapshot = reg.matching("e");
        reg.clear();
        assert_eq!(snapshot.len(), 2);
        assert!(reg.matching("e").is_empty());
    }
}
