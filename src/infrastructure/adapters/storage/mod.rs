//! Storage Adapter - 文件系统存储实现

mod file_image_storage;
mod manifest_writer;

pub use file_image_storage::FileImageStorage;
pub use manifest_writer::{write_manifest, ManifestError, MANIFEST_FILE_NAME};
