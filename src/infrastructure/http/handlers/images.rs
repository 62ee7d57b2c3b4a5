//! Image Query HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{GetModelInfo, ListImages};
use crate::infrastructure::http::dto::{ApiResponse, ImageResponse, ModelInfo};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 列出已生成的图像（最新在前，剔除文件已丢失的记录）
pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ImageResponse>>>, ApiError> {
    let records = state
        .list_images_handler
        .handle(ListImages { verify: true })
        .await?;

    Ok(Json(ApiResponse::success(
        records.into_iter().map(Into::into).collect(),
    )))
}

/// 当前模型信息
pub async fn model_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ModelInfo>>, ApiError> {
    let info = state.model_info_handler.handle(GetModelInfo).await?;
    Ok(Json(ApiResponse::success(info.into())))
}
