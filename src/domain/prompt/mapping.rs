//! Prompt Context - 解析结果

use crate::domain::batch::Item;

/// 条目 key → 提示词
///
/// 不变量:
/// - 与条目集合一一对应，无重复、无缺失
/// - 按条目顺序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptMapping {
    entries: Vec<(String, String)>,
}

impl PromptMapping {
    pub(crate) fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, item_key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == item_key)
            .map(|(_, prompt)| prompt.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// 纯提示词模式：由映射的 key 构造条目
    pub fn prompt_only_items(&self) -> Vec<Item> {
        self.keys().map(Item::prompt_only).collect()
    }
}
