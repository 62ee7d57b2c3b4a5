//! Request Dispatcher - 带等待预算的单次推理派发
//!
//! 推理调用在独立任务上执行；超出预算时调用方立即返回 `Timeout`，
//! 同时取消在途请求（不会遗留后台连接）

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    DispatchError, InferenceEnginePort, InferenceRequest, ResponsePayload,
};

/// 推理派发器
#[derive(Clone)]
pub struct RequestDispatcher {
    engine: Arc<dyn InferenceEnginePort>,
}

impl RequestDispatcher {
    pub fn new(engine: Arc<dyn InferenceEnginePort>) -> Self {
        Self { engine }
    }

    /// 派发一次推理，最长等待 `wait_budget`
    pub async fn dispatch(
        &self,
        request: InferenceRequest,
        wait_budget: Duration,
    ) -> Result<ResponsePayload, DispatchError> {
        self.dispatch_with_cancel(request, wait_budget, &CancellationToken::new())
            .await
    }

    /// 派发一次推理；`parent` 被取消时在途请求一并取消并返回 `Cancelled`
    pub async fn dispatch_with_cancel(
        &self,
        request: InferenceRequest,
        wait_budget: Duration,
        parent: &CancellationToken,
    ) -> Result<ResponsePayload, DispatchError> {
        let item_key = request.item_key.clone();
        let token = parent.child_token();

        let engine = Arc::clone(&self.engine);
        let call_token = token.clone();
        let mut handle = tokio::spawn(async move { engine.infer(request, call_token).await });

        let envelope = tokio::select! {
            joined = &mut handle => match joined {
                Ok(result) => result?,
                Err(e) => {
                    tracing::error!(item = %item_key, error = %e, "Inference task failed");
                    return Err(DispatchError::Internal(e.to_string()));
                }
            },
            _ = tokio::time::sleep(wait_budget) => {
                token.cancel();
                handle.abort();
                tracing::warn!(
                    item = %item_key,
                    budget_secs = wait_budget.as_secs_f64(),
                    "Wait budget exceeded, request cancelled"
                );
                return Err(DispatchError::Timeout);
            }
            _ = parent.cancelled() => {
                token.cancel();
                handle.abort();
                tracing::info!(item = %item_key, "Dispatch interrupted");
                return Err(DispatchError::Cancelled);
            }
        };

        ResponsePayload::from_envelope(envelope)
    }
}
