//! Batch Context - 批量条目

use std::path::{Path, PathBuf};

/// 纯提示词模式下合成 key 的前缀
pub const SYNTHETIC_PREFIX: &str = "prompt_";

/// 生成第 index 个合成 key（`prompt_0`, `prompt_1`, ...）
pub fn synthetic_key(index: usize) -> String {
    format!("{}{}", SYNTHETIC_PREFIX, index)
}

/// 批量处理中的一个条目
///
/// 不变量:
/// - key 在一次批量中唯一
/// - 图像条目的 name/stem 由 key 对应的路径推导
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    name: String,
    stem: String,
    input: Option<PathBuf>,
}

impl Item {
    /// 图像 + 提示词条目
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path.to_string_lossy().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| key.clone());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.clone());

        Self {
            key,
            name,
            stem,
            input: Some(path),
        }
    }

    /// 纯提示词条目
    pub fn prompt_only(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            stem: key.clone(),
            key,
            input: None,
        }
    }

    /// 第 index 个合成的纯提示词条目
    pub fn synthetic(index: usize) -> Self {
        Self::prompt_only(synthetic_key(index))
    }

    /// 完整标识（路径或合成 id）
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 短名（文件名）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// 输出文件名使用的 id：图像条目取 stem，纯提示词条目取 key
    pub fn id(&self) -> &str {
        if self.input.is_some() {
            &self.stem
        } else {
            &self.key
        }
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn is_prompt_only(&self) -> bool {
        self.input.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_item_names() {
        let item = Item::from_path("inputs/cats/a.png");
        assert_eq!(item.key(), "inputs/cats/a.png");
        assert_eq!(item.name(), "a.png");
        assert_eq!(item.stem(), "a");
        assert_eq!(item.id(), "a");
        assert!(!item.is_prompt_only());
    }

    #[test]
    fn test_synthetic_item() {
        let item = Item::synthetic(3);
        assert_eq!(item.key(), "prompt_3");
        assert_eq!(item.id(), "prompt_3");
        assert!(item.is_prompt_only());
        assert!(item.input_path().is_none());
    }
}
