//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::info;

use super::middleware::access_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 生成图像目录（/generated）
    pub generated_dir: PathBuf,
    /// 上传图像目录（/uploads）
    pub uploads_dir: PathBuf,
    /// 前端静态文件目录（未匹配的路径回落到这里）
    pub static_dir: Option<PathBuf>,
    /// 请求体大小上限（字节）
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            generated_dir: PathBuf::from("generated"),
            uploads_dir: PathBuf::from("uploads"),
            static_dir: None,
            body_limit: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_dirs(mut self, generated_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = generated_dir.into();
        self.uploads_dir = uploads_dir.into();
        self
    }

    pub fn with_static_dir(mut self, static_dir: Option<PathBuf>) -> Self {
        self.static_dir = static_dir;
        self
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn build_router(&self) -> Router {
        // CORS 配置 - 允许所有来源的跨域请求
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        let mut routes = create_routes(&self.config.generated_dir, &self.config.uploads_dir);
        if let Some(static_dir) = &self.config.static_dir {
            routes = routes.fallback_service(ServeDir::new(static_dir));
        }

        routes
            .layer(DefaultBodyLimit::max(self.config.body_limit))
            .layer(middleware::from_fn(access_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{GenerationDefaults, ImageStoragePort, ModelSelection};
    use crate::infrastructure::adapters::{FakeModelClient, FileImageStorage, TINY_PNG};
    use crate::infrastructure::events::EventPublisher;
    use crate::infrastructure::http::state::GenerationTiming;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteImageRepository,
    };
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    struct Fixture {
        router: Router,
        dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let generated_dir = dir.path().join("generated");
        let uploads_dir = dir.path().join("uploads");

        let generated = Arc::new(FileImageStorage::new(&generated_dir).await.unwrap());
        let uploads = Arc::new(FileImageStorage::new(&uploads_dir).await.unwrap());

        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let state = AppState::new(
            Arc::new(FakeModelClient::new()),
            generated,
            uploads,
            Arc::new(SqliteImageRepository::new(pool)),
            EventPublisher::new().arc(),
            ModelSelection::new("qwen-image"),
            GenerationDefaults::default(),
            GenerationTiming {
                wait_budget: Duration::from_secs(5),
                estimated_wait: None,
            },
        );

        let config = ServerConfig::default()
            .with_dirs(&generated_dir, &uploads_dir)
            .with_body_limit(1024 * 1024);
        let router = HttpServer::new(config, state).build_router();

        Fixture { router, dir }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let fx = fixture().await;
        let request = Request::builder().uri("/api/ping").body(Body::empty()).unwrap();

        let response = fx.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["model_server"], json!(true));
    }

    #[tokio::test]
    async fn test_generate_then_list_and_serve() {
        let fx = fixture().await;

        let response = fx
            .router
            .clone()
            .oneshot(post_json("/api/generate", json!({"prompt": "a red fox", "seed": 3})))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["errno"], json!(0));
        assert_eq!(body["data"]["success"], json!(true));

        let url = body["data"]["images"][0]["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/generated/a_red_fox_"));

        let request = Request::builder().uri("/api/images/list").body(Body::empty()).unwrap();
        let list = body_json(fx.router.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
        assert_eq!(list["data"][0]["seed"], json!(3));

        let request = Request::builder().uri(url.as_str()).body(Body::empty()).unwrap();
        let response = fx.router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], TINY_PNG);
    }

    #[tokio::test]
    async fn test_generate_without_inputs_is_bad_request() {
        let fx = fixture().await;

        let response = fx
            .router
            .oneshot(post_json("/api/generate", json!({"prompt": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["errno"], json!(400));
    }

    #[tokio::test]
    async fn test_upload_multipart() {
        let fx = fixture().await;

        let boundary = "X-IMAGINE-BOUNDARY";
        let mut payload = Vec::new();
        payload.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\n",
                b = boundary
            )
            .as_bytes(),
        );
        payload.extend_from_slice(TINY_PNG);
        payload.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(payload))
            .unwrap();

        let body = body_json(fx.router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["errno"], json!(0));
        assert_eq!(body["data"]["size"], json!(TINY_PNG.len()));

        let filename = body["data"]["filename"].as_str().unwrap();
        assert!(filename.ends_with(".png"));
        let uploads = FileImageStorage::new(fx.dir.path().join("uploads")).await.unwrap();
        assert!(uploads.exists(filename).await);
    }

    #[tokio::test]
    async fn test_model_info() {
        let fx = fixture().await;
        let request = Request::builder().uri("/api/model/info").body(Body::empty()).unwrap();

        let body = body_json(fx.router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["data"]["model"], json!("qwen-image"));
        assert_eq!(body["data"]["default_model"], json!("qwen-image"));
    }
}
