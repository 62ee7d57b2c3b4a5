//! Upload HTTP Handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::application::UploadImage;
use crate::infrastructure::http::dto::{ApiResponse, UploadResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 上传源图像（multipart 字段 `file`）
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut upload: Option<UploadImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(multipart_error)?
            .to_vec();

        upload = Some(UploadImage { original_name, data });
    }

    let command = upload.ok_or_else(|| ApiError::BadRequest("No file part.".to_string()))?;
    let result = state.upload_handler.handle(command).await?;

    tracing::info!(filename = %result.filename, size = result.size, "Image uploaded");

    Ok(Json(ApiResponse::success(result.into())))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
    }
}
