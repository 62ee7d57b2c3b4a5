//! Upload Command Handlers

use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::commands::UploadImage;
use crate::application::error::ApplicationError;
use crate::application::ports::ImageStoragePort;
use crate::domain::batch::secure_filename;

/// 允许上传的图像扩展名
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// 上传响应
#[derive(Debug, Clone)]
pub struct UploadImageResponse {
    pub filename: String,
    pub size: usize,
}

/// UploadImage Handler
pub struct UploadImageHandler {
    uploads: Arc<dyn ImageStoragePort>,
}

impl UploadImageHandler {
    pub fn new(uploads: Arc<dyn ImageStoragePort>) -> Self {
        Self { uploads }
    }

    pub async fn handle(&self, command: UploadImage) -> Result<UploadImageResponse, ApplicationError> {
        if command.original_name.trim().is_empty() {
            return Err(ApplicationError::validation("No selected file."));
        }
        if command.data.is_empty() {
            return Err(ApplicationError::validation("Uploaded file is empty."));
        }

        let extension = Path::new(&command.original_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApplicationError::validation(format!(
                "Unsupported file type: '{}'",
                command.original_name
            )));
        }

        let filename = secure_filename(&format!("{}.{}", Uuid::new_v4(), extension));
        self.uploads.save_image(&filename, &command.data).await?;

        tracing::info!(
            filename = %filename,
            original = %command.original_name,
            size = command.data.len(),
            "Image uploaded"
        );

        Ok(UploadImageResponse {
            filename,
            size: command.data.len(),
        })
    }
}
