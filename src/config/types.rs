//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 推理服务配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 生成参数默认值
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 批量客户端配置
    #[serde(default)]
    pub client: ClientConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,

    /// 静态文件服务配置
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// 静态文件服务配置（Web UI）
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// 是否启用静态文件服务
    #[serde(default)]
    pub enabled: bool,

    /// 静态文件目录
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "localhost"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 推理服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// 推理服务基础 URL
    #[serde(default = "default_model_url")]
    pub url: String,

    /// 默认模型名
    #[serde(default = "default_model_name")]
    pub name: String,

    /// 完整的推理端点（覆盖 `{url}/predictions/{name}`）
    #[serde(default)]
    pub endpoint: Option<String>,

    /// 单次 HTTP 请求超时（秒）
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// 是否校验 TLS 证书
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// 单次请求最多生成的图像数
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,

    /// 每次派发的等待预算（秒）
    #[serde(default = "default_wait_budget")]
    pub wait_budget_secs: u64,

    /// 估算的单次推理耗时（秒），未设置时不推送估算进度
    #[serde(default)]
    pub estimated_wait_secs: Option<f64>,
}

fn default_model_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_model_name() -> String {
    "qwen-image".to_string()
}

fn default_model_timeout() -> u64 {
    600
}

fn default_verify_tls() -> bool {
    true
}

fn default_max_batch() -> u32 {
    4
}

fn default_wait_budget() -> u64 {
    300
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_model_url(),
            name: default_model_name(),
            endpoint: None,
            timeout_secs: default_model_timeout(),
            verify_tls: default_verify_tls(),
            max_batch: default_max_batch(),
            wait_budget_secs: default_wait_budget(),
            estimated_wait_secs: None,
        }
    }
}

impl ModelConfig {
    pub fn wait_budget(&self) -> Duration {
        Duration::from_secs(self.wait_budget_secs)
    }

    /// 非正数视为未设置
    pub fn estimated_wait(&self) -> Option<Duration> {
        self.estimated_wait_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// 生成参数默认值
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_dimension")]
    pub width: u32,

    #[serde(default = "default_dimension")]
    pub height: u32,

    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,

    #[serde(default = "default_steps")]
    pub num_inference_steps: u32,
}

fn default_dimension() -> u32 {
    1024
}

fn default_guidance_scale() -> f64 {
    4.0
}

fn default_steps() -> u32 {
    50
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            guidance_scale: default_guidance_scale(),
            num_inference_steps: default_steps(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/imagine.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 生成图像目录
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,

    /// 上传源图像目录
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// 上传文件最大大小（字节），默认 16MB
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("data/generated")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_max_upload_size() -> u64 {
    16 * 1024 * 1024 // 16 MB
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            generated_dir: default_generated_dir(),
            uploads_dir: default_uploads_dir(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// 批量客户端配置
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// 输出目录（图像 + output.json）
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 提示词规格：字符串（字面提示词或文件路径）、列表或表
    #[serde(default)]
    pub prompt: Option<Value>,

    /// 覆盖 model.wait_budget_secs
    #[serde(default)]
    pub wait_budget_secs: Option<u64>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            prompt: None,
            wait_budget_secs: None,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
