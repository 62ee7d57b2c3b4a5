//! Image Storage Port - 出站端口
//!
//! 定义生成图像的落盘抽象

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 图像存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

/// Image Storage Port - 出站端口
#[async_trait]
pub trait ImageStoragePort: Send + Sync {
    /// 输出目录
    fn output_dir(&self) -> &Path;

    /// 文件名对应的完整输出路径
    fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir().join(file_name)
    }

    /// 保存图像，返回写入的路径
    async fn save_image(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, StorageError>;

    /// 读取图像
    async fn read_image(&self, file_name: &str) -> Result<Vec<u8>, StorageError>;

    /// 图像是否存在
    async fn exists(&self, file_name: &str) -> bool;
}
