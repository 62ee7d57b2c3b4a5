//! Generation Command Handlers

use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::application::batch::{failure_reason, ProgressEstimator, RequestDispatcher};
use crate::application::commands::GenerateImages;
use crate::application::error::ApplicationError;
use crate::application::model_selection::ModelSelection;
use crate::application::ports::{
    ImageRecord, ImageRepositoryPort, ImageStoragePort, InferenceEnginePort, InferenceRequest,
    NoopProgress, ProgressSink,
};
use crate::domain::batch::{secure_filename, InferenceResult, OUTPUT_EXTENSION};
use crate::domain::generation::GenerationParams;

/// 生成参数的服务端默认值
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub max_batch: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            guidance_scale: 4.0,
            num_inference_steps: 50,
            max_batch: 4,
        }
    }
}

impl GenerationDefaults {
    /// 补齐未设置的字段，并将 batch 限制在 max_batch 内
    pub fn apply(&self, params: &mut GenerationParams) {
        params.seed.get_or_insert(0);
        params.width.get_or_insert(self.width);
        params.height.get_or_insert(self.height);
        params.guidance_scale.get_or_insert(self.guidance_scale);
        params.num_inference_steps.get_or_insert(self.num_inference_steps);
        params.negative_prompt.get_or_insert_with(String::new);
        params.clamp_batch(self.max_batch);
    }
}

/// GenerateImages Handler
///
/// 单次派发，保存返回的全部图像并写入图像记录
pub struct GenerateImagesHandler {
    dispatcher: RequestDispatcher,
    generated: Arc<dyn ImageStoragePort>,
    uploads: Arc<dyn ImageStoragePort>,
    image_repo: Arc<dyn ImageRepositoryPort>,
    models: ModelSelection,
    defaults: GenerationDefaults,
    progress: Arc<dyn ProgressSink>,
    estimator: ProgressEstimator,
    wait_budget: Duration,
}

impl GenerateImagesHandler {
    pub fn new(
        engine: Arc<dyn InferenceEnginePort>,
        generated: Arc<dyn ImageStoragePort>,
        uploads: Arc<dyn ImageStoragePort>,
        image_repo: Arc<dyn ImageRepositoryPort>,
        models: ModelSelection,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(engine),
            generated,
            uploads,
            image_repo,
            models,
            defaults,
            progress: Arc::new(NoopProgress),
            estimator: ProgressEstimator::disabled(),
            wait_budget: Duration::from_secs(300),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_estimated_wait(mut self, estimate: Option<Duration>) -> Self {
        self.estimator = ProgressEstimator::new(estimate);
        self
    }

    pub fn with_wait_budget(mut self, wait_budget: Duration) -> Self {
        self.wait_budget = wait_budget;
        self
    }

    pub async fn handle(&self, command: GenerateImages) -> Result<Vec<ImageRecord>, ApplicationError> {
        let source_image = command
            .image
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if command.prompt.trim().is_empty() && source_image.is_none() {
            return Err(ApplicationError::validation("No inputs provided."));
        }

        let model = self.models.select(command.model.as_deref()).await;

        let mut params = command.params;
        self.defaults.apply(&mut params);

        let image = match &source_image {
            Some(name) => self.load_source_image(name).await?,
            None => None,
        };

        let request_id = Uuid::new_v4().to_string();
        let request = InferenceRequest::new(&request_id, &command.prompt, params.clone())
            .with_image(image)
            .with_model(Some(model.clone()));

        tracing::info!(
            request_id = %request_id,
            model = %model,
            batch = ?params.batch,
            has_image = source_image.is_some(),
            "Generation requested"
        );

        self.progress
            .item_started(0, 1, &request_id, &command.prompt);
        let progress = self.estimator.start(&request_id, Arc::clone(&self.progress));
        let started = Instant::now();
        let outcome = self.dispatcher.dispatch(request, self.wait_budget).await;
        let latency = started.elapsed().as_secs_f64();
        progress.finish();

        let payload = match outcome {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Generation failed");
                self.progress.item_finished(&InferenceResult::failed(
                    &request_id,
                    &command.prompt,
                    failure_reason(&e),
                    e.to_string(),
                    Some(latency),
                    params.to_fields(),
                ));
                return Err(e.into());
            }
        };

        let mut encoded_images = payload.images();
        if encoded_images.is_empty() {
            encoded_images.extend(payload.first_image());
        }
        if encoded_images.is_empty() {
            return Err(ApplicationError::ExternalServiceError(
                "No image found in model server response.".to_string(),
            ));
        }

        let settings = settings_snapshot(&params, &model, source_image.as_deref());
        let mut records = Vec::with_capacity(encoded_images.len());

        for encoded in encoded_images {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| ApplicationError::ExternalServiceError(format!("Invalid image data: {}", e)))?;

            let short_id = Uuid::new_v4().simple().to_string();
            let stem = format!("{}_{}", command.prompt, &short_id[..8]);
            let filename = format!("{}.{}", secure_filename(&stem), OUTPUT_EXTENSION);

            let path = self.generated.save_image(&filename, &bytes).await?;

            let mut record = ImageRecord::new(
                &filename,
                path.to_string_lossy(),
                format!("/generated/{}", filename),
                &command.prompt,
                &model,
            );
            record.seed = params.seed;
            record.source_image = source_image.clone();
            record.settings = settings.clone();

            self.image_repo.save(&record).await?;

            self.progress.item_finished(&InferenceResult::succeeded(
                &request_id,
                &command.prompt,
                path,
                latency,
                params.to_fields(),
            ));

            records.push(record);
        }

        tracing::info!(
            request_id = %request_id,
            images = records.len(),
            latency,
            "Generation completed"
        );

        Ok(records)
    }

    /// 读取上传目录中的源图像；文件不存在时忽略
    async fn load_source_image(&self, name: &str) -> Result<Option<String>, ApplicationError> {
        if !self.uploads.exists(name).await {
            tracing::warn!(image = %name, "Source image not found in uploads, ignoring");
            return Ok(None);
        }

        let bytes = self.uploads.read_image(name).await?;
        Ok(Some(base64::engine::general_purpose::STANDARD.encode(bytes)))
    }
}

/// 数据库中保存的参数快照
fn settings_snapshot(params: &GenerationParams, model: &str, source_image: Option<&str>) -> Value {
    let mut settings = params.to_fields();
    settings.insert("model".to_string(), Value::from(model));
    settings.insert(
        "source_image".to_string(),
        source_image.map(Value::from).unwrap_or(Value::Null),
    );
    Value::Object(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DispatchError;
    use crate::infrastructure::adapters::{FakeBehavior, FakeModelClient, FileImageStorage, TINY_PNG};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteImageRepository,
    };
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        engine: Arc<FakeModelClient>,
        repo: Arc<SqliteImageRepository>,
        handler: GenerateImagesHandler,
    }

    async fn fixture(engine: FakeModelClient) -> Fixture {
        let dir = TempDir::new().unwrap();
        let generated = Arc::new(FileImageStorage::new(dir.path().join("generated")).await.unwrap());
        let uploads = Arc::new(FileImageStorage::new(dir.path().join("uploads")).await.unwrap());

        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = Arc::new(SqliteImageRepository::new(pool));

        let engine = Arc::new(engine);
        let handler = GenerateImagesHandler::new(
            engine.clone(),
            generated,
            uploads,
            repo.clone(),
            ModelSelection::new("qwen-image"),
            GenerationDefaults::default(),
        )
        .with_wait_budget(Duration::from_secs(5));

        Fixture {
            dir,
            engine,
            repo,
            handler,
        }
    }

    #[test]
    fn test_defaults_apply() {
        let mut params = GenerationParams {
            batch: Some(10),
            width: Some(512),
            ..Default::default()
        };
        GenerationDefaults::default().apply(&mut params);

        assert_eq!(params.seed, Some(0));
        assert_eq!(params.width, Some(512));
        assert_eq!(params.height, Some(1024));
        assert_eq!(params.batch, Some(4));
        assert_eq!(params.negative_prompt.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_rejects_empty_inputs() {
        let fx = fixture(FakeModelClient::new()).await;
        let result = fx.handler.handle(GenerateImages::default()).await;
        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        assert!(fx.engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_saves_every_returned_image() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(TINY_PNG);
        let envelope = json!({"body": {"images": [encoded.clone(), encoded]}});
        let fx = fixture(FakeModelClient::with_default(FakeBehavior::Respond(envelope))).await;

        let records = fx
            .handler
            .handle(GenerateImages {
                prompt: "a red fox".into(),
                model: Some("qwen-image-edit".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record.filename.starts_with("a_red_fox_"));
            assert!(record.filename.ends_with(".png"));
            assert_eq!(record.url, format!("/generated/{}", record.filename));
            assert_eq!(record.model, "qwen-image-edit");
            assert_eq!(record.settings["seed"], json!(0));
            assert!(fx.dir.path().join("generated").join(&record.filename).exists());
        }
        assert_eq!(fx.repo.find_all().await.unwrap().len(), 2);

        let requests = fx.engine.requests();
        let request = &requests[0];
        assert_eq!(request.model.as_deref(), Some("qwen-image-edit"));
        assert_eq!(request.params.batch, Some(1));
    }

    #[tokio::test]
    async fn test_uses_uploaded_source_image() {
        let fx = fixture(FakeModelClient::new()).await;
        std::fs::write(fx.dir.path().join("uploads").join("src.png"), TINY_PNG).unwrap();

        let records = fx
            .handler
            .handle(GenerateImages {
                prompt: String::new(),
                image: Some("src.png".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(records[0].source_image.as_deref(), Some("src.png"));
        assert!(fx.engine.requests()[0].image.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_error_is_external_service_error() {
        let fx = fixture(FakeModelClient::with_default(FakeBehavior::Fail(
            DispatchError::Transport("refused".into()),
        )))
        .await;

        let result = fx
            .handler
            .handle(GenerateImages {
                prompt: "a cat".into(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::ExternalServiceError(_))));
        assert!(fx.repo.find_all().await.unwrap().is_empty());
    }
}
