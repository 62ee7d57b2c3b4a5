//! File Storage - 文件系统图像存储实现
//!
//! 实现 ImageStoragePort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ImageStoragePort, StorageError};

/// 文件系统图像存储
pub struct FileImageStorage {
    /// 输出目录
    base_dir: PathBuf,
}

impl FileImageStorage {
    /// 创建新的文件存储
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    /// 文件名不允许包含路径分隔符或上级目录
    fn checked_path(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(file_name);
        let is_plain = candidate.components().count() == 1
            && candidate.file_name().map(|n| n == candidate.as_os_str()).unwrap_or(false);

        if file_name.is_empty() || !is_plain {
            return Err(StorageError::InvalidData(format!(
                "invalid file name: {}",
                file_name
            )));
        }

        Ok(self.base_dir.join(file_name))
    }
}

#[async_trait]
impl ImageStoragePort for FileImageStorage {
    fn output_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn save_image(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.checked_path(file_name)?;

        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        tracing::debug!(path = %path.display(), size = data.len(), "Saved image");

        Ok(path)
    }

    async fn read_image(&self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.checked_path(file_name)?;

        if !path.exists() {
            return Err(StorageError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        fs::read(&path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))
    }

    async fn exists(&self, file_name: &str) -> bool {
        match self.checked_path(file_name) {
            Ok(path) => fs::metadata(&path).await.is_ok(),
            Err(_) => false,
        }
    }
}
