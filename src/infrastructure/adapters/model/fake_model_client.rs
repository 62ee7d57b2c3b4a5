//! Fake Model Client - 用于测试的推理客户端
//!
//! 按条目 key 脚本化响应，不实际调用推理服务

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DispatchError, InferenceEnginePort, InferenceRequest};

/// 1x1 透明 PNG
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// 脚本化行为
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// 立即返回给定信封
    Respond(Value),
    /// 立即返回错误
    Fail(DispatchError),
    /// 永不返回，直到被取消
    Hang,
    /// 延迟后返回给定信封（可被取消）
    Delay(Duration, Value),
}

/// Fake Model Client
pub struct FakeModelClient {
    default: FakeBehavior,
    scripted: HashMap<String, FakeBehavior>,
    requests: Mutex<Vec<InferenceRequest>>,
    cancellations: AtomicUsize,
}

impl FakeModelClient {
    /// 默认对每个请求返回一张 1x1 PNG
    pub fn new() -> Self {
        Self::with_default(FakeBehavior::Respond(Self::image_envelope(TINY_PNG)))
    }

    pub fn with_default(default: FakeBehavior) -> Self {
        Self {
            default,
            scripted: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            cancellations: AtomicUsize::new(0),
        }
    }

    /// 为指定条目设置行为
    pub fn on(mut self, item_key: impl Into<String>, behavior: FakeBehavior) -> Self {
        self.scripted.insert(item_key.into(), behavior);
        self
    }

    /// 包含一张图像的响应信封（`body` 为 JSON 字符串）
    pub fn image_envelope(image: &[u8]) -> Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        json!({ "body": json!({ "images": [encoded] }).to_string() })
    }

    /// 已收到的请求
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// 观察到取消的次数
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    fn cancelled(&self) -> Result<Value, DispatchError> {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::Cancelled)
    }
}

impl Default for FakeModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceEnginePort for FakeModelClient {
    async fn infer(
        &self,
        request: InferenceRequest,
        cancel: CancellationToken,
    ) -> Result<Value, DispatchError> {
        let behavior = self
            .scripted
            .get(&request.item_key)
            .unwrap_or(&self.default)
            .clone();

        tracing::debug!(item = %request.item_key, behavior = ?behavior, "FakeModelClient: scripted response");

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match behavior {
            FakeBehavior::Respond(envelope) => Ok(envelope),
            FakeBehavior::Fail(err) => Err(err),
            FakeBehavior::Hang => {
                cancel.cancelled().await;
                self.cancelled()
            }
            FakeBehavior::Delay(delay, envelope) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(envelope),
                    _ = cancel.cancelled() => self.cancelled(),
                }
            }
        }
    }
}
