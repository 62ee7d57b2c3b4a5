//! Inference Engine Port - 图像推理服务抽象
//!
//! 定义远程推理调用的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::generation::GenerationParams;

/// 派发错误
///
/// `Timeout` 的 Display 固定为 "Timeout"，会原样写入清单
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Timeout")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 单次推理请求
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// 条目 key（用于日志和追踪）
    pub item_key: String,
    pub prompt: String,
    /// base64 编码的输入图像
    pub image: Option<String>,
    /// 目标模型名（为空时使用适配器默认值）
    pub model: Option<String>,
    pub params: GenerationParams,
}

impl InferenceRequest {
    pub fn new(item_key: impl Into<String>, prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            item_key: item_key.into(),
            prompt: prompt.into(),
            image: None,
            model: None,
            params,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// 请求体：全部参数 + prompt（+ image）
    pub fn to_body(&self) -> Value {
        let mut body = self.params.to_fields();
        body.insert("prompt".to_string(), Value::from(self.prompt.clone()));
        if let Some(image) = &self.image {
            body.insert("image".to_string(), Value::from(image.clone()));
        }
        Value::Object(body)
    }
}

/// 解包后的响应内容（信封中 `body` 字段的内容）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePayload(Map<String, Value>);

impl ResponsePayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// 解包信封：`body` 可以是对象，也可以是包含 JSON 的字符串
    pub fn from_envelope(envelope: Value) -> Result<Self, DispatchError> {
        let mut envelope = match envelope {
            Value::Object(map) => map,
            other => {
                return Err(DispatchError::Decode(format!(
                    "expected JSON object envelope, got {}",
                    type_name(&other)
                )))
            }
        };

        let body = envelope
            .remove("body")
            .ok_or_else(|| DispatchError::Decode("missing 'body' field in response".to_string()))?;

        match body {
            Value::Object(map) => Ok(Self(map)),
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Ok(Self(map)),
                Ok(other) => Err(DispatchError::Decode(format!(
                    "'body' must contain a JSON object, got {}",
                    type_name(&other)
                ))),
                Err(e) => Err(DispatchError::Decode(format!("invalid JSON in 'body': {}", e))),
            },
            other => Err(DispatchError::Decode(format!(
                "'body' must be an object or a JSON string, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// `images` 数组中的 base64 图像
    pub fn images(&self) -> Vec<&str> {
        match self.0.get("images") {
            Some(Value::Array(images)) => images
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 第一张图像（`images[0]`，否则 `image`）
    pub fn first_image(&self) -> Option<&str> {
        self.images().into_iter().next().or_else(|| {
            self.0
                .get("image")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Inference Engine Port
///
/// 外部图像推理服务的抽象接口，返回未解包的 JSON 信封
#[async_trait]
pub trait InferenceEnginePort: Send + Sync {
    /// 执行一次推理
    ///
    /// `cancel` 被触发时实现应尽快放弃在途请求并返回 `DispatchError::Cancelled`
    async fn infer(
        &self,
        request: InferenceRequest,
        cancel: CancellationToken,
    ) -> Result<Value, DispatchError>;

    /// 检查推理服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_as_object() {
        let payload = ResponsePayload::from_envelope(json!({"body": {"images": ["aGk="]}})).unwrap();
        assert_eq!(payload.first_image(), Some("aGk="));
    }

    #[test]
    fn test_body_as_json_string() {
        let envelope = json!({"statusCode": 200, "body": "{\"image\": \"aGk=\"}"});
        let payload = ResponsePayload::from_envelope(envelope).unwrap();
        assert_eq!(payload.first_image(), Some("aGk="));
        assert!(payload.images().is_empty());
    }

    #[test]
    fn test_missing_body_is_decode_error() {
        let err = ResponsePayload::from_envelope(json!({"images": []})).unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));

        let err = ResponsePayload::from_envelope(json!({"body": "not json"})).unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[test]
    fn test_no_image_in_body() {
        let payload = ResponsePayload::from_envelope(json!({"body": {"images": []}})).unwrap();
        assert!(payload.first_image().is_none());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(DispatchError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn test_request_body() {
        let params = GenerationParams::new().with_seed(7);
        let request = InferenceRequest::new("a.png", "a cat", params).with_image(Some("aGk=".into()));
        let body = request.to_body();
        assert_eq!(body["prompt"], json!("a cat"));
        assert_eq!(body["image"], json!("aGk="));
        assert_eq!(body["seed"], json!(7));
    }
}
