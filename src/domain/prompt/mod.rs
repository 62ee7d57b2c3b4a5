//! Prompt Context - 提示词限界上下文
//!
//! 职责:
//! - 提示词规格（字面量 / 列表 / 映射 / 文件）
//! - 在任何派发之前一次性解析为 条目 → 提示词 映射

mod errors;
mod mapping;
mod resolver;
mod spec;

pub use errors::PromptResolutionError;
pub use mapping::PromptMapping;
pub use resolver::resolve;
pub use spec::{PromptSpec, PromptValue};
