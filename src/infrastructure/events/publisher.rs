//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现；同时作为生成流程的 ProgressSink

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::ProgressSink;
use crate::domain::batch::{InferenceResult, ItemOutcome};

/// WebSocket 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 开始生成
    GenerationStarted {
        request_id: String,
        prompt: String,
        index: usize,
        total: usize,
    },
    /// 估算进度
    GenerationProgress { request_id: String, progress: f64 },
    /// 图像已保存
    ImageSaved {
        request_id: String,
        filename: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        latency: Option<f64>,
    },
    /// 生成失败
    GenerationFailed {
        request_id: String,
        reason: String,
        error: String,
    },
}

/// 事件发布器
pub struct EventPublisher {
    /// 全局广播通道
    global_channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(100);
        Self {
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    /// 发布事件（全局广播）
    pub fn publish(&self, event: WsEvent) {
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for EventPublisher {
    fn item_started(&self, index: usize, total: usize, item_key: &str, prompt: &str) {
        self.publish(WsEvent::GenerationStarted {
            request_id: item_key.to_string(),
            prompt: prompt.to_string(),
            index,
            total,
        });
    }

    fn progress(&self, item_key: &str, fraction: f64) {
        self.publish(WsEvent::GenerationProgress {
            request_id: item_key.to_string(),
            progress: fraction,
        });
    }

    fn item_finished(&self, result: &InferenceResult) {
        let event = match &result.outcome {
            ItemOutcome::Succeeded { filename } => WsEvent::ImageSaved {
                request_id: result.item_key.clone(),
                filename: filename
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                latency: result.latency,
            },
            ItemOutcome::Failed { reason, error } => WsEvent::GenerationFailed {
                request_id: result.item_key.clone(),
                reason: reason.to_string(),
                error: error.clone(),
            },
        };
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::FailureReason;
    use serde_json::Map;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_progress_sink_events() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe_global();

        publisher.item_started(0, 1, "req-1", "a cat");
        publisher.progress("req-1", 0.5);
        publisher.item_finished(&InferenceResult::succeeded(
            "req-1",
            "a cat",
            PathBuf::from("/data/generated/a_cat_1234abcd.png"),
            1.5,
            Map::new(),
        ));

        assert!(matches!(rx.recv().await.unwrap(), WsEvent::GenerationStarted { .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::GenerationProgress {
                request_id: "req-1".into(),
                progress: 0.5
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::ImageSaved {
                request_id: "req-1".into(),
                filename: "a_cat_1234abcd.png".into(),
                latency: Some(1.5),
            }
        );
    }

    #[test]
    fn test_failed_event_serialization() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe_global();

        publisher.item_finished(&InferenceResult::failed(
            "req-2",
            "x",
            FailureReason::TimedOut,
            "Timeout",
            Some(300.0),
            Map::new(),
        ));

        let event = rx.try_recv().unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "GenerationFailed");
        assert_eq!(json["data"]["reason"], "timed_out");
    }

    #[test]
    fn test_publish_without_receivers() {
        let publisher = EventPublisher::new();
        publisher.progress("nobody", 0.1);
    }
}
