//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml，或显式指定的路径）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "IMAGINE";

/// 加载应用配置
///
/// # 环境变量示例
/// - `IMAGINE_SERVER__PORT=8080`
/// - `IMAGINE_MODEL__URL=http://inference:8080`
/// - `IMAGINE_MODEL__ESTIMATED_WAIT_SECS=12.5`
/// - `IMAGINE_DATABASE__PATH=/data/imagine.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索默认配置文件（均为可选）
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("model.url", "http://localhost:8080")?
        .set_default("model.name", "qwen-image")?
        .set_default("model.timeout_secs", 600)?
        .set_default("model.verify_tls", true)?
        .set_default("model.max_batch", 4)?
        .set_default("model.wait_budget_secs", 300)?
        .set_default("generation.width", 1024)?
        .set_default("generation.height", 1024)?
        .set_default("generation.guidance_scale", 4.0)?
        .set_default("generation.num_inference_steps", 50)?
        .set_default("database.path", "data/imagine.db")?
        .set_default("database.max_connections", 5)?
        .set_default("storage.generated_dir", "data/generated")?
        .set_default("storage.uploads_dir", "data/uploads")?
        .set_default("storage.max_upload_size", 16 * 1024 * 1024)?
        .set_default("client.output_dir", "output")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 层级分隔符: __ (双下划线)，例如 IMAGINE_MODEL__URL
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.model.url.trim().is_empty() && config.model.endpoint.is_none() {
        return Err(ConfigError::ValidationError(
            "Model URL cannot be empty".to_string(),
        ));
    }

    if config.model.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Model name cannot be empty".to_string(),
        ));
    }

    if config.model.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Model timeout cannot be 0".to_string(),
        ));
    }

    if config.model.max_batch == 0 {
        return Err(ConfigError::ValidationError(
            "max_batch must be at least 1".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Model URL: {}", config.model.url);
    tracing::info!("Model: {}", config.model.name);
    if let Some(endpoint) = &config.model.endpoint {
        tracing::info!("Model Endpoint: {}", endpoint);
    }
    tracing::info!("Model Timeout: {}s", config.model.timeout_secs);
    tracing::info!("Wait Budget: {}s", config.model.wait_budget_secs);
    match config.model.estimated_wait() {
        Some(wait) => tracing::info!("Estimated Wait: {:.1}s", wait.as_secs_f64()),
        None => tracing::info!("Estimated Wait: disabled"),
    }
    tracing::info!("Max Batch: {}", config.model.max_batch);
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Generated Directory: {:?}", config.storage.generated_dir);
    tracing::info!("Uploads Directory: {:?}", config.storage.uploads_dir);
    if config.server.static_files.enabled {
        tracing::info!("Static Files: {:?}", config.server.static_files.dir);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_model() {
        let mut config = AppConfig::default();
        config.model.url = String::new();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.model.name = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_max_batch() {
        let mut config = AppConfig::default();
        config.model.max_batch = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
[server]
port = 8088

[model]
url = "http://inference:9000"
estimated_wait_secs = 12.5

[client]
output_dir = "runs/today"
prompt = ["a red fox", "a blue whale"]
"#,
        );

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.model.url, "http://inference:9000");
        assert_eq!(config.model.name, "qwen-image");
        assert_eq!(config.model.estimated_wait_secs, Some(12.5));
        assert_eq!(config.client.output_dir, std::path::PathBuf::from("runs/today"));
        assert_eq!(
            config.client.prompt,
            Some(serde_json::json!(["a red fox", "a blue whale"]))
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let file = write_config("[model]\nmax_batch = 0\n");
        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
