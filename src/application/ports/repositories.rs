//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（如 SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Image Repository
// ============================================================================

/// 已生成图像（用于持久化）
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: Uuid,
    pub filename: String,
    pub filepath: String,
    /// 对外访问地址（如 `/generated/xxx.png`）
    pub url: String,
    pub prompt: String,
    pub seed: Option<i64>,
    /// 输入图像（上传文件名）
    pub source_image: Option<String>,
    /// 生成时使用的模型
    pub model: String,
    /// 生成参数快照
    pub settings: Value,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(
        filename: impl Into<String>,
        filepath: impl Into<String>,
        url: impl Into<String>,
        prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            filepath: filepath.into(),
            url: url.into(),
            prompt: prompt.into(),
            seed: None,
            source_image: None,
            model: model.into(),
            settings: Value::Null,
            created_at: Utc::now(),
        }
    }
}

/// Image Repository Port
#[async_trait]
pub trait ImageRepositoryPort: Send + Sync {
    /// 保存图像记录
    async fn save(&self, image: &ImageRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>, RepositoryError>;

    /// 全部记录，按创建时间倒序
    async fn find_all(&self) -> Result<Vec<ImageRecord>, RepositoryError>;

    /// 删除记录
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
