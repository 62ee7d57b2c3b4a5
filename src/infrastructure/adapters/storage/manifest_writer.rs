//! Manifest Writer - 运行清单落盘
//!
//! 先写临时文件再 rename，清单要么完整存在要么不存在

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::domain::batch::BatchManifest;

/// 清单文件名
pub const MANIFEST_FILE_NAME: &str = "output.json";

/// 清单写入错误（批量级致命）
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ManifestError {
    let path = path.to_path_buf();
    move |source| ManifestError::Io { path, source }
}

/// 将清单写入 `output_dir/output.json`，返回写入路径
pub async fn write_manifest(
    output_dir: &Path,
    manifest: &BatchManifest,
) -> Result<PathBuf, ManifestError> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(io_err(output_dir))?;

    let content = serde_json::to_string_pretty(&manifest.to_json())?;

    let path = output_dir.join(MANIFEST_FILE_NAME);
    let tmp_path = output_dir.join(format!(".{}.tmp", MANIFEST_FILE_NAME));

    fs::write(&tmp_path, content).await.map_err(io_err(&tmp_path))?;
    fs::rename(&tmp_path, &path).await.map_err(io_err(&path))?;

    tracing::info!(
        path = %path.display(),
        entries = manifest.len(),
        interrupted = manifest.is_interrupted(),
        "Manifest written"
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{FailureReason, InferenceResult};
    use serde_json::{Map, Value};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let mut manifest = BatchManifest::new();
        manifest.push(InferenceResult::failed(
            "prompt_0",
            "",
            FailureReason::InputError,
            "No input prompt or image.",
            None,
            Map::new(),
        ));

        let path = write_manifest(temp_dir.path(), &manifest).await.unwrap();
        assert_eq!(path, temp_dir.path().join("output.json"));

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["prompt_0"]["reason"], "input_error");
        assert!(!temp_dir.path().join(".output.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_empty_manifest_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested").join("out");

        let path = write_manifest(&out, &BatchManifest::new()).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().trim(), "{}");
    }
}
