//! Batch Use Case - 批量推理编排
//!
//! - RequestDispatcher: 单次派发（等待预算 + 取消）
//! - ProgressEstimator: 估算进度
//! - BatchRunner: 顺序处理条目并生成运行清单

mod dispatcher;
mod progress;
mod runner;

pub use dispatcher::RequestDispatcher;
pub use progress::{ProgressEstimator, ProgressHandle, DEFAULT_TICK_INTERVAL};
pub use runner::{failure_reason, BatchRunner};
