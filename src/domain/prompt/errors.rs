//! Prompt Context - Errors

use std::path::PathBuf;
use thiserror::Error;

/// 提示词解析错误（批量级致命错误，派发前抛出）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptResolutionError {
    #[error("以下条目没有匹配的提示词: {}", .items.join(", "))]
    MissingPrompts { items: Vec<String> },

    #[error("无效的提示词规格: {0}")]
    InvalidSpecShape(String),

    #[error("无法读取提示词文件 {}: {reason}", .path.display())]
    FileRead { path: PathBuf, reason: String },

    #[error("无法解析提示词文件 {}: {reason}", .path.display())]
    FileParse { path: PathBuf, reason: String },
}

impl PromptResolutionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidSpecShape(message.into())
    }
}
