//! Progress Port - 进度回调
//!
//! 批量运行的观察者接口；CLI 进度条和 WebSocket 事件各自实现

use crate::domain::batch::InferenceResult;

/// 进度接收方
///
/// 所有方法都有空实现，按需覆盖
pub trait ProgressSink: Send + Sync {
    /// 条目开始派发（index 从 0 开始）
    fn item_started(&self, _index: usize, _total: usize, _item_key: &str, _prompt: &str) {}

    /// 估算进度，fraction ∈ [0, 1]；同一条目内单调不减
    fn progress(&self, _item_key: &str, _fraction: f64) {}

    /// 条目到达终态
    fn item_finished(&self, _result: &InferenceResult) {}
}

/// 不做任何事的进度接收方
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}
