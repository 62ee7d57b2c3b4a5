//! Generate HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, GenerateRequest, GenerateResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 生成图像（单次派发，进度通过 /ws/events 推送）
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateResponse>>, ApiError> {
    let records = state.generate_handler.handle(req.into()).await?;

    tracing::info!(count = records.len(), "Generation request completed");

    Ok(Json(ApiResponse::success(GenerateResponse {
        success: true,
        images: records.into_iter().map(Into::into).collect(),
    })))
}
