//! Imagine - 图像生成 Web 服务
//!
//! - Domain: batch/, prompt/, generation/
//! - Application: batch, commands, queries, ports
//! - Infrastructure: http, persistence, adapters, events

use std::sync::Arc;

use imagine::application::{GenerationDefaults, InferenceEnginePort, ModelSelection};
use imagine::config::{load_config, print_config};
use imagine::infrastructure::adapters::{FileImageStorage, HttpModelClient, HttpModelClientConfig};
use imagine::infrastructure::events::EventPublisher;
use imagine::infrastructure::http::{AppState, GenerationTiming, HttpServer, ServerConfig};
use imagine::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteImageRepository,
};
use imagine::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log, &["tower_http=debug"]);

    tracing::info!("Imagine - 图像生成服务");
    print_config(&config);

    // 确保数据库目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::new(&config.database.path)
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let image_repo = Arc::new(SqliteImageRepository::new(pool));

    // 文件存储（目录不存在时自动创建）
    let generated = Arc::new(FileImageStorage::new(&config.storage.generated_dir).await?);
    let uploads = Arc::new(FileImageStorage::new(&config.storage.uploads_dir).await?);

    // 推理服务客户端
    let model_config = HttpModelClientConfig::new(&config.model.url, &config.model.name)
        .with_endpoint(config.model.endpoint.clone())
        .with_timeout(config.model.timeout_secs)
        .with_verify_tls(config.model.verify_tls);
    let inference_engine = Arc::new(HttpModelClient::new(model_config)?);

    if !inference_engine.health_check().await {
        tracing::warn!(url = %config.model.url, "Model server is not reachable yet");
    }

    let event_publisher = EventPublisher::new().arc();

    let defaults = GenerationDefaults {
        width: config.generation.width,
        height: config.generation.height,
        guidance_scale: config.generation.guidance_scale,
        num_inference_steps: config.generation.num_inference_steps,
        max_batch: config.model.max_batch,
    };
    let timing = GenerationTiming {
        wait_budget: config.model.wait_budget(),
        estimated_wait: config.model.estimated_wait(),
    };

    let state = AppState::new(
        inference_engine,
        generated,
        uploads,
        image_repo,
        event_publisher,
        ModelSelection::new(&config.model.name),
        defaults,
        timing,
    );

    let static_dir = config
        .server
        .static_files
        .enabled
        .then(|| config.server.static_files.dir.clone());
    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_dirs(&config.storage.generated_dir, &config.storage.uploads_dir)
        .with_static_dir(static_dir)
        .with_body_limit(usize::try_from(config.storage.max_upload_size).unwrap_or(usize::MAX));

    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
