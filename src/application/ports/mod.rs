//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod image_storage;
mod inference_engine;
mod progress;
mod repositories;

pub use image_storage::{ImageStoragePort, StorageError};
pub use inference_engine::{
    DispatchError, InferenceEnginePort, InferenceRequest, ResponsePayload,
};
pub use progress::{NoopProgress, ProgressSink};
pub use repositories::{ImageRecord, ImageRepositoryPort, RepositoryError};
