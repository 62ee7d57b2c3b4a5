//! 输入条目收集
//!
//! `--image` 可以是单个文件、图像目录或 glob 模式

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::batch::Item;

/// 目录扫描时接受的扩展名（大小写不敏感）
pub const INPUT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Failed to read directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No input images found at '{0}'")]
    NoImages(String),
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| INPUT_IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 收集输入条目，按路径排序并去重
pub fn collect_items(input: &str) -> Result<Vec<Item>, CollectError> {
    let path = Path::new(input);

    let paths: BTreeSet<PathBuf> = if path.is_file() {
        BTreeSet::from([path.to_path_buf()])
    } else if path.is_dir() {
        scan_dir(path)?
    } else {
        expand_glob(input)?
    };

    if paths.is_empty() {
        return Err(CollectError::NoImages(input.to_string()));
    }

    tracing::debug!(input, count = paths.len(), "Collected input images");

    Ok(paths.into_iter().map(Item::from_path).collect())
}

fn scan_dir(dir: &Path) -> Result<BTreeSet<PathBuf>, CollectError> {
    let io_err = |source| CollectError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.insert(path);
        }
    }
    Ok(paths)
}

fn expand_glob(pattern: &str) -> Result<BTreeSet<PathBuf>, CollectError> {
    let matches = glob::glob(pattern).map_err(|e| CollectError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    Ok(matches
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable glob match");
                None
            }
        })
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect())
}
