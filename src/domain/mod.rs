//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Prompt Context: 提示词规格与解析
//! - Batch Context: 批量条目、输出命名与运行清单
//! - Generation Context: 生成参数

pub mod batch;
pub mod generation;
pub mod prompt;
