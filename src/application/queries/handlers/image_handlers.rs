//! Image Query Handlers

use std::path::Path;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::model_selection::ModelSelection;
use crate::application::ports::{ImageRecord, ImageRepositoryPort};
use crate::application::queries::{GetModelInfo, ListImages};

/// ListImages Handler
pub struct ListImagesHandler {
    image_repo: Arc<dyn ImageRepositoryPort>,
}

impl ListImagesHandler {
    pub fn new(image_repo: Arc<dyn ImageRepositoryPort>) -> Self {
        Self { image_repo }
    }

    pub async fn handle(&self, query: ListImages) -> Result<Vec<ImageRecord>, ApplicationError> {
        let images = self.image_repo.find_all().await?;
        if !query.verify {
            return Ok(images);
        }

        let mut kept = Vec::with_capacity(images.len());
        for image in images {
            if tokio::fs::metadata(Path::new(&image.filepath)).await.is_ok() {
                kept.push(image);
            } else {
                tracing::info!(id = %image.id, path = %image.filepath, "Image file missing, removing record");
                self.image_repo.delete(image.id).await?;
            }
        }

        Ok(kept)
    }
}

/// 模型信息响应
#[derive(Debug, Clone)]
pub struct ModelInfoResponse {
    pub model: String,
    pub default_model: String,
}

/// GetModelInfo Handler
pub struct GetModelInfoHandler {
    models: ModelSelection,
}

impl GetModelInfoHandler {
    pub fn new(models: ModelSelection) -> Self {
        Self { models }
    }

    pub async fn handle(&self, _query: GetModelInfo) -> Result<ModelInfoResponse, ApplicationError> {
        Ok(ModelInfoResponse {
            model: self.models.current().await,
            default_model: self.models.default_model().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteImageRepository,
    };
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_verify_drops_missing_files() {
        let dir = TempDir::new().unwrap();
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = Arc::new(SqliteImageRepository::new(pool));

        let present = dir.path().join("present.png");
        std::fs::write(&present, b"png").unwrap();
        let kept = ImageRecord::new("present.png", present.to_string_lossy(), "/generated/present.png", "a", "m");
        let gone = ImageRecord::new("gone.png", dir.path().join("gone.png").to_string_lossy(), "/generated/gone.png", "b", "m");
        repo.save(&kept).await.unwrap();
        repo.save(&gone).await.unwrap();

        let handler = ListImagesHandler::new(repo.clone());

        let all = handler.handle(ListImages { verify: false }).await.unwrap();
        assert_eq!(all.len(), 2);

        let verified = handler.handle(ListImages { verify: true }).await.unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].filename, "present.png");
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_model_info() {
        let models = ModelSelection::new("qwen-image");
        models.select(Some("flux")).await;

        let info = GetModelInfoHandler::new(models).handle(GetModelInfo).await.unwrap();
        assert_eq!(info.model, "flux");
        assert_eq!(info.default_model, "qwen-image");
    }
}
