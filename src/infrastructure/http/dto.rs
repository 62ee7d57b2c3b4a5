//! Data Transfer Objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::{GenerateImages, ImageRecord, ModelInfoResponse, UploadImageResponse};
use crate::domain::generation::GenerationParams;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Generation DTOs
// ============================================================================

/// 生成请求（未知字段作为扩展参数透传给推理服务）
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    pub image: Option<String>,
    pub model: Option<String>,
    pub seed: Option<i64>,
    pub batch_size: Option<u32>,
    pub negative_prompt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub num_inference_steps: Option<u32>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl From<GenerateRequest> for GenerateImages {
    fn from(req: GenerateRequest) -> Self {
        GenerateImages {
            prompt: req.prompt,
            image: req.image,
            model: req.model,
            params: GenerationParams {
                seed: req.seed,
                width: req.width,
                height: req.height,
                guidance_scale: req.guidance_scale,
                num_inference_steps: req.num_inference_steps,
                negative_prompt: req.negative_prompt,
                batch: req.batch_size,
                extras: req.extras,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    pub prompt: String,
    pub seed: Option<i64>,
    pub source_image: Option<String>,
    pub model: String,
    pub settings: Value,
    pub created_at: String,
}

impl From<ImageRecord> for ImageResponse {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            url: record.url,
            prompt: record.prompt,
            seed: record.seed,
            source_image: record.source_image,
            model: record.model,
            settings: record.settings,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub images: Vec<ImageResponse>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub size: usize,
}

impl From<UploadImageResponse> for UploadResponse {
    fn from(resp: UploadImageResponse) -> Self {
        Self {
            success: true,
            filename: resp.filename,
            size: resp.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub default_model: String,
}

impl From<ModelInfoResponse> for ModelInfo {
    fn from(resp: ModelInfoResponse) -> Self {
        Self {
            model: resp.model,
            default_model: resp.default_model,
        }
    }
}
