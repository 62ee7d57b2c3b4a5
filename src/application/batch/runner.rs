//! Batch Runner - 顺序批量推理
//!
//! 对每个条目：取提示词 → 读取输入图像 → 派发 → 保存输出 → 记录结果。
//! 单个条目失败不会中止批量；每个条目恰好产生一条结果。

use base64::Engine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{ProgressEstimator, RequestDispatcher};
use crate::application::ports::{
    DispatchError, ImageStoragePort, InferenceEnginePort, InferenceRequest, NoopProgress,
    ProgressSink,
};
use crate::domain::batch::{BatchManifest, FailureReason, InferenceResult, Item, OutputNamer};
use crate::domain::generation::GenerationParams;
use crate::domain::prompt::PromptMapping;

/// 批量推理执行器
pub struct BatchRunner {
    dispatcher: RequestDispatcher,
    storage: Arc<dyn ImageStoragePort>,
    progress: Arc<dyn ProgressSink>,
    estimator: ProgressEstimator,
    model: Option<String>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(engine: Arc<dyn InferenceEnginePort>, storage: Arc<dyn ImageStoragePort>) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(engine),
            storage,
            progress: Arc::new(NoopProgress),
            estimator: ProgressEstimator::disabled(),
            model: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// 预估单次推理耗时；None 时不输出估算进度
    pub fn with_estimated_wait(mut self, estimate: Option<Duration>) -> Self {
        self.estimator = ProgressEstimator::new(estimate);
        self
    }

    pub fn with_estimator(mut self, estimator: ProgressEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 运行级取消令牌
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 按输入顺序处理全部条目
    ///
    /// 取消时停在下一个条目之前；在途条目记为 `Interrupted`，清单标记为中断
    pub async fn run(
        &self,
        items: &[Item],
        mapping: &PromptMapping,
        params: &GenerationParams,
        wait_budget: Duration,
    ) -> BatchManifest {
        let mut manifest = BatchManifest::new();
        let mut namer = OutputNamer::new();
        let total = items.len();

        tracing::info!(
            items = total,
            budget_secs = wait_budget.as_secs_f64(),
            output_dir = %self.storage.output_dir().display(),
            "Batch started"
        );

        for (index, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(processed = index, total, "Batch interrupted");
                manifest.mark_interrupted();
                break;
            }

            let result = self
                .process_item(index, total, item, mapping, params, wait_budget, &mut namer)
                .await;

            self.progress.item_finished(&result);
            let interrupted = result.reason() == Some(FailureReason::Interrupted);
            manifest.push(result);

            if interrupted {
                tracing::warn!(processed = index + 1, total, "Batch interrupted");
                manifest.mark_interrupted();
                break;
            }
        }

        tracing::info!(
            succeeded = manifest.succeeded_count(),
            failed = manifest.failed_count(),
            interrupted = manifest.is_interrupted(),
            "Batch finished"
        );

        manifest
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_item(
        &self,
        index: usize,
        total: usize,
        item: &Item,
        mapping: &PromptMapping,
        params: &GenerationParams,
        wait_budget: Duration,
        namer: &mut OutputNamer,
    ) -> InferenceResult {
        let key = item.key();
        let echoed = params.to_fields();

        let Some(prompt) = mapping.get(key) else {
            tracing::warn!(item = %key, "No input prompt");
            return InferenceResult::failed(
                key,
                "",
                FailureReason::InputError,
                "No input prompt.",
                None,
                echoed,
            );
        };

        if prompt.trim().is_empty() && item.is_prompt_only() {
            tracing::warn!(item = %key, "No input prompt or image");
            return InferenceResult::failed(
                key,
                prompt,
                FailureReason::InputError,
                "No input prompt or image.",
                None,
                echoed,
            );
        }

        let image = match item.input_path() {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                Err(e) => {
                    tracing::warn!(item = %key, error = %e, "Failed to read input image");
                    return InferenceResult::failed(
                        key,
                        prompt,
                        FailureReason::ReadError,
                        format!("Failed to read input image {}: {}", path.display(), e),
                        None,
                        echoed,
                    );
                }
            },
            None => None,
        };

        let request = InferenceRequest::new(key, prompt, params.clone())
            .with_image(image)
            .with_model(self.model.clone());

        self.progress.item_started(index, total, key, prompt);
        let progress = self.estimator.start(key, Arc::clone(&self.progress));
        let started = Instant::now();

        let outcome = self
            .dispatcher
            .dispatch_with_cancel(request, wait_budget, &self.cancel)
            .await;

        let latency = started.elapsed().as_secs_f64();
        progress.finish();

        let payload = match outcome {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(item = %key, error = %e, latency, "Dispatch failed");
                return InferenceResult::failed(
                    key,
                    prompt,
                    failure_reason(&e),
                    e.to_string(),
                    Some(latency),
                    echoed,
                );
            }
        };

        let Some(encoded) = payload.first_image() else {
            tracing::warn!(item = %key, "No image found in response");
            return InferenceResult::failed(
                key,
                prompt,
                FailureReason::NoOutputInResponse,
                "No image found in model server response.",
                Some(latency),
                echoed,
            );
        };

        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                return InferenceResult::failed(
                    key,
                    prompt,
                    FailureReason::SaveError,
                    format!("save_error=invalid base64 image data: {}", e),
                    Some(latency),
                    echoed,
                );
            }
        };

        let file_name = namer.next_name(item.id(), prompt);
        match self.storage.save_image(&file_name, &bytes).await {
            Ok(path) => {
                tracing::info!(item = %key, path = %path.display(), latency, "Image saved");
                InferenceResult::succeeded(key, prompt, path, latency, echoed)
            }
            Err(e) => {
                tracing::error!(item = %key, error = %e, "Failed to save image");
                InferenceResult::failed(
                    key,
                    prompt,
                    FailureReason::SaveError,
                    format!("save_error={}", e),
                    Some(latency),
                    echoed,
                )
            }
        }
    }
}

/// 派发错误 → 条目失败原因
pub fn failure_reason(error: &DispatchError) -> FailureReason {
    match error {
        DispatchError::Timeout => FailureReason::TimedOut,
        DispatchError::Transport(_) => FailureReason::TransportError,
        DispatchError::Server { .. } => FailureReason::ServerError,
        DispatchError::Decode(_) => FailureReason::DecodeError,
        DispatchError::Cancelled => FailureReason::Interrupted,
        DispatchError::Internal(_) => FailureReason::Internal,
    }
}
