//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;
use std::time::Duration;

use crate::application::{
    // Command handlers
    GenerateImagesHandler, GenerationDefaults, UploadImageHandler,
    // Query handlers
    GetModelInfoHandler, ListImagesHandler,
    // Ports
    ImageRepositoryPort, ImageStoragePort, InferenceEnginePort, ModelSelection,
};
use crate::infrastructure::events::EventPublisher;

/// 生成请求的等待预算与估算耗时
#[derive(Debug, Clone, Copy)]
pub struct GenerationTiming {
    pub wait_budget: Duration,
    pub estimated_wait: Option<Duration>,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub inference_engine: Arc<dyn InferenceEnginePort>,
    pub image_repo: Arc<dyn ImageRepositoryPort>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub generate_handler: GenerateImagesHandler,
    pub upload_handler: UploadImageHandler,

    // ========== Query Handlers ==========
    pub list_images_handler: ListImagesHandler,
    pub model_info_handler: GetModelInfoHandler,
}

impl AppState {
    /// 创建应用状态
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inference_engine: Arc<dyn InferenceEnginePort>,
        generated: Arc<dyn ImageStoragePort>,
        uploads: Arc<dyn ImageStoragePort>,
        image_repo: Arc<dyn ImageRepositoryPort>,
        event_publisher: Arc<EventPublisher>,
        models: ModelSelection,
        defaults: GenerationDefaults,
        timing: GenerationTiming,
    ) -> Self {
        let generate_handler = GenerateImagesHandler::new(
            inference_engine.clone(),
            generated,
            uploads.clone(),
            image_repo.clone(),
            models.clone(),
            defaults,
        )
        .with_progress(event_publisher.clone())
        .with_wait_budget(timing.wait_budget)
        .with_estimated_wait(timing.estimated_wait);

        Self {
            // Ports
            inference_engine: inference_engine.clone(),
            image_repo: image_repo.clone(),
            event_publisher: event_publisher.clone(),

            // Command handlers
            generate_handler,
            upload_handler: UploadImageHandler::new(uploads),

            // Query handlers
            list_images_handler: ListImagesHandler::new(image_repo.clone()),
            model_info_handler: GetModelInfoHandler::new(models),
        }
    }
}
