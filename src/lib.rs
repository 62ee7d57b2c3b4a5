//! Imagine - 批量图像推理编排
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Batch Context: 条目、输出命名、结果清单
//! - Prompt Context: 提示词规格与解析
//! - Generation Context: 生成参数
//!
//! 应用层 (application/):
//! - Ports: 端口定义（InferenceEngine, ImageStorage, Repositories, ProgressSink）
//! - Batch: RequestDispatcher, ProgressEstimator, BatchRunner
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - CLI: 批量客户端的条目收集与进度条
//! - Persistence: SQLite 图像记录
//! - Adapters: 推理服务客户端, 文件存储, 清单写入
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::{load_config, AppConfig};
