//! Batch Context - 批量推理限界上下文
//!
//! 职责:
//! - 条目标识（图像路径 / 合成 id）
//! - 输出文件命名
//! - 运行清单

mod filename;
mod item;
mod manifest;

pub use filename::{
    sanitize_id, sanitize_prompt, secure_filename, OutputNamer, MAX_PROMPT_CHARS,
    OUTPUT_EXTENSION,
};
pub use item::{synthetic_key, Item, SYNTHETIC_PREFIX};
pub use manifest::{BatchManifest, FailureReason, InferenceResult, ItemOutcome};
