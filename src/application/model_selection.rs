//! 当前模型选择
//!
//! 生成请求可以切换模型；模型信息查询读取同一份状态

use std::sync::Arc;
use tokio::sync::RwLock;

/// 进程内共享的当前模型名
#[derive(Debug, Clone)]
pub struct ModelSelection {
    default_model: String,
    current: Arc<RwLock<String>>,
}

impl ModelSelection {
    pub fn new(default_model: impl Into<String>) -> Self {
        let default_model = default_model.into();
        Self {
            current: Arc::new(RwLock::new(default_model.clone())),
            default_model,
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub async fn current(&self) -> String {
        self.current.read().await.clone()
    }

    /// 切换模型；None 或空字符串时回到默认模型，返回生效的模型名
    pub async fn select(&self, model: Option<&str>) -> String {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        let mut current = self.current.write().await;
        if *current != model {
            tracing::info!(from = %*current, to = %model, "Model switched");
            *current = model.clone();
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_and_fallback() {
        let selection = ModelSelection::new("qwen-image");
        assert_eq!(selection.current().await, "qwen-image");

        assert_eq!(selection.select(Some("qwen-image-edit")).await, "qwen-image-edit");
        assert_eq!(selection.current().await, "qwen-image-edit");

        assert_eq!(selection.select(None).await, "qwen-image");
        assert_eq!(selection.select(Some("  ")).await, "qwen-image");
    }
}
