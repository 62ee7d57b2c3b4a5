//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping              GET   健康检查
//! - /api/model/info        GET   当前模型
//! - /api/generate          POST  生成图像（进度通过 WS 推送）
//! - /api/upload            POST  上传源图像（multipart `file`）
//! - /api/images/list       GET   列出已生成图像
//! - /ws/events             WS    全局 WebSocket（生成事件）
//! - /generated/*           GET   生成的图像文件
//! - /uploads/*             GET   上传的源图像文件

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(generated_dir: &Path, uploads_dir: &Path) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
        .nest_service("/generated", ServeDir::new(generated_dir))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/model/info", get(handlers::model_info))
        .route("/generate", post(handlers::generate))
        .route("/upload", post(handlers::upload_image))
        .route("/images/list", get(handlers::list_images))
}
