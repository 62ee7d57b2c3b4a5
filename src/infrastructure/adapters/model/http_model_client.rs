//! HTTP Model Client - 调用远程图像推理服务
//!
//! 实现 InferenceEnginePort trait
//!
//! 推理服务 API:
//! POST {url}/predictions/{model}
//! Request: {"prompt": "...", "image": "<base64>", "seed": 42, ...}  (JSON)
//! Response: {"body": {"images": ["<base64 png>"]}}，body 也可能是 JSON 字符串

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DispatchError, InferenceEnginePort, InferenceRequest};

/// HTTP 推理客户端配置
#[derive(Debug, Clone)]
pub struct HttpModelClientConfig {
    /// 推理服务基础 URL
    pub base_url: String,
    /// 默认模型名
    pub model: String,
    /// 完整端点 URL（设置后忽略 base_url/model）
    pub endpoint: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 是否校验 TLS 证书
    pub verify_tls: bool,
}

impl Default for HttpModelClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            model: "qwen-image".to_string(),
            endpoint: None,
            timeout_secs: 300,
            verify_tls: true,
        }
    }
}

impl HttpModelClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// 指定模型对应的推理 URL
    pub fn endpoint_for(&self, model: Option<&str>) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }
        format!(
            "{}/predictions/{}",
            self.base_url.trim_end_matches('/'),
            model.unwrap_or(&self.model)
        )
    }
}

/// HTTP 推理客户端
pub struct HttpModelClient {
    client: Client,
    config: HttpModelClientConfig,
}

impl HttpModelClient {
    /// 创建新的 HTTP 推理客户端
    pub fn new(config: HttpModelClientConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !config.verify_tls {
            tracing::warn!("TLS certificate verification disabled for model client");
        }

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpModelClientConfig {
        &self.config
    }

    /// 获取健康检查 URL
    fn health_url(&self) -> String {
        format!("{}/ping", self.config.base_url.trim_end_matches('/'))
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, DispatchError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(DispatchError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| DispatchError::Decode(format!("response is not valid JSON: {}", e)))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout
    } else if e.is_connect() {
        DispatchError::Transport(format!("Cannot connect to model service: {}", e))
    } else {
        DispatchError::Transport(e.to_string())
    }
}

#[async_trait]
impl InferenceEnginePort for HttpModelClient {
    async fn infer(
        &self,
        request: InferenceRequest,
        cancel: CancellationToken,
    ) -> Result<Value, DispatchError> {
        let url = self.config.endpoint_for(request.model.as_deref());
        let body = request.to_body();

        tracing::debug!(
            url = %url,
            item = %request.item_key,
            prompt_len = request.prompt.len(),
            has_image = request.image.is_some(),
            "Sending inference request"
        );

        let envelope = tokio::select! {
            result = self.post(&url, &body) => result?,
            _ = cancel.cancelled() => {
                tracing::debug!(item = %request.item_key, "Inference request cancelled");
                return Err(DispatchError::Cancelled);
            }
        };

        tracing::debug!(item = %request.item_key, "Inference response received");
        Ok(envelope)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::GenerationParams;
    use serde_json::json;

    fn request() -> InferenceRequest {
        InferenceRequest::new("a.png", "a cat", GenerationParams::new().with_seed(1))
    }

    fn client_for(url: &str, timeout_secs: u64) -> HttpModelClient {
        HttpModelClient::new(
            HttpModelClientConfig::new(url, "test-model").with_timeout(timeout_secs),
        )
        .unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = HttpModelClientConfig::default();
        assert_eq!(config.timeout_secs, 300);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_endpoint_for() {
        let config = HttpModelClientConfig::new("http://model:8080/", "qwen");
        assert_eq!(config.endpoint_for(None), "http://model:8080/predictions/qwen");
        assert_eq!(
            config.endpoint_for(Some("flux")),
            "http://model:8080/predictions/flux"
        );

        let config = config.with_endpoint(Some("http://other/infer".to_string()));
        assert_eq!(config.endpoint_for(Some("flux")), "http://other/infer");
    }

    #[tokio::test]
    async fn test_infer_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predictions/test-model")
            .match_body(mockito::Matcher::PartialJson(json!({"prompt": "a cat", "seed": 1})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"body": {"images": ["aGk="]}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 10);
        let envelope = client.infer(request(), CancellationToken::new()).await.unwrap();

        assert_eq!(envelope["body"]["images"][0], json!("aGk="));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_infer_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predictions/test-model")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = client_for(&server.url(), 10);
        let err = client.infer(request(), CancellationToken::new()).await.unwrap_err();

        assert_eq!(
            err,
            DispatchError::Server {
                status: 503,
                body: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_infer_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predictions/test-model")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client_for(&server.url(), 10);
        let err = client.infer(request(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_infer_connection_refused() {
        // 绑定后立即释放端口，确保无人监听
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr), 5);
        let err = client.infer(request(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_infer_cancelled_while_server_silent() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_for(&format!("http://{}", addr), 60);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = client.infer(request(), cancel).await.unwrap_err();
        assert_eq!(err, DispatchError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/ping").with_status(200).create_async().await;

        let client = client_for(&server.url(), 10);
        assert!(client.health_check().await);
    }
}
