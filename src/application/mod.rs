//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（InferenceEngine、ImageStorage、Repository、ProgressSink）
//! - batch: 批量推理（派发、进度估算、顺序执行）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod batch;
pub mod commands;
pub mod error;
pub mod model_selection;
pub mod ports;
pub mod queries;

// Re-exports
pub use batch::{BatchRunner, ProgressEstimator, RequestDispatcher};

pub use commands::{
    GenerateImages,
    UploadImage,
    // Handlers
    handlers::{
        GenerateImagesHandler, GenerationDefaults, UploadImageHandler, UploadImageResponse,
    },
};

pub use error::ApplicationError;
pub use model_selection::ModelSelection;

pub use ports::{
    // Inference engine
    DispatchError,
    InferenceEnginePort,
    InferenceRequest,
    ResponsePayload,
    // Storage
    ImageStoragePort,
    StorageError,
    // Repositories
    ImageRecord,
    ImageRepositoryPort,
    RepositoryError,
    // Progress
    NoopProgress,
    ProgressSink,
};

pub use queries::{
    GetModelInfo,
    ListImages,
    // Handlers
    handlers::{GetModelInfoHandler, ListImagesHandler, ModelInfoResponse},
};
