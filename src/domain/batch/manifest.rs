//! Batch Context - 运行清单
//!
//! 每个条目恰好一条 InferenceResult；清单在内存中累积，运行结束时一次性写出

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// 条目失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// 既没有提示词也没有输入图像
    InputError,
    /// 输入图像读取失败
    ReadError,
    /// 超出等待预算
    TimedOut,
    /// 连接/DNS/TLS 失败
    TransportError,
    /// 非 2xx 响应
    ServerError,
    /// 响应不是合法 JSON 或缺少 body
    DecodeError,
    /// 响应中没有图像
    NoOutputInResponse,
    /// 输出无法保存
    SaveError,
    /// 运行被中断
    Interrupted,
    /// 其他内部错误
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InputError => "input_error",
            FailureReason::ReadError => "read_error",
            FailureReason::TimedOut => "timed_out",
            FailureReason::TransportError => "transport_error",
            FailureReason::ServerError => "server_error",
            FailureReason::DecodeError => "decode_error",
            FailureReason::NoOutputInResponse => "no_output_in_response",
            FailureReason::SaveError => "save_error",
            FailureReason::Interrupted => "interrupted",
            FailureReason::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 条目终态
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Succeeded { filename: PathBuf },
    Failed { reason: FailureReason, error: String },
}

/// 单个条目的推理结果
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub item_key: String,
    pub prompt: String,
    /// 从派发到返回的耗时（秒）；未派发时为 None
    pub latency: Option<f64>,
    pub outcome: ItemOutcome,
    /// 回显的请求参数
    pub parameters: Map<String, Value>,
}

impl InferenceResult {
    pub fn succeeded(
        item_key: impl Into<String>,
        prompt: impl Into<String>,
        filename: PathBuf,
        latency: f64,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            item_key: item_key.into(),
            prompt: prompt.into(),
            latency: Some(latency),
            outcome: ItemOutcome::Succeeded { filename },
            parameters,
        }
    }

    pub fn failed(
        item_key: impl Into<String>,
        prompt: impl Into<String>,
        reason: FailureReason,
        error: impl Into<String>,
        latency: Option<f64>,
        parameters: Map<String, Value>,
    ) -> Self {
        Self {
            item_key: item_key.into(),
            prompt: prompt.into(),
            latency,
            outcome: ItemOutcome::Failed {
                reason,
                error: error.into(),
            },
            parameters,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Succeeded { .. })
    }

    pub fn filename(&self) -> Option<&Path> {
        match &self.outcome {
            ItemOutcome::Succeeded { filename } => Some(filename),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Failed { error, .. } => Some(error),
            ItemOutcome::Succeeded { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match &self.outcome {
            ItemOutcome::Failed { reason, .. } => Some(*reason),
            ItemOutcome::Succeeded { .. } => None,
        }
    }

    /// 清单中的 JSON 条目：回显参数 + filename/latency/prompt（失败时附 error/reason）
    pub fn to_entry(&self) -> Value {
        let mut entry = self.parameters.clone();

        entry.insert(
            "filename".to_string(),
            self.filename()
                .map(|p| Value::from(p.to_string_lossy().to_string()))
                .unwrap_or(Value::Null),
        );
        entry.insert(
            "latency".to_string(),
            self.latency.map(Value::from).unwrap_or(Value::Null),
        );
        entry.insert("prompt".to_string(), Value::from(self.prompt.clone()));

        if let ItemOutcome::Failed { reason, error } = &self.outcome {
            entry.insert("error".to_string(), Value::from(error.clone()));
            entry.insert("reason".to_string(), Value::from(reason.as_str()));
        }

        Value::Object(entry)
    }
}

/// 批量运行清单
#[derive(Debug, Clone, Default)]
pub struct BatchManifest {
    results: Vec<InferenceResult>,
    interrupted: bool,
}

impl BatchManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个终态结果
    pub fn push(&mut self, result: InferenceResult) {
        self.results.push(result);
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[InferenceResult] {
        &self.results
    }

    pub fn get(&self, item_key: &str) -> Option<&InferenceResult> {
        self.results.iter().find(|r| r.item_key == item_key)
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.succeeded_count()
    }

    /// 以条目 key 为键的 JSON 对象（保持条目顺序）
    pub fn to_json(&self) -> Value {
        let entries: Map<String, Value> = self
            .results
            .iter()
            .map(|r| (r.item_key.clone(), r.to_entry()))
            .collect();
        Value::Object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("seed".to_string(), json!(42));
        map
    }

    #[test]
    fn test_success_entry() {
        let result = InferenceResult::succeeded(
            "a.png",
            "draw a cat",
            PathBuf::from("out/a_draw_a_cat.png"),
            1.2,
            params(),
        );

        let entry = result.to_entry();
        assert_eq!(entry["filename"], json!("out/a_draw_a_cat.png"));
        assert_eq!(entry["latency"], json!(1.2));
        assert_eq!(entry["prompt"], json!("draw a cat"));
        assert_eq!(entry["seed"], json!(42));
        assert!(entry.get("error").is_none());
        assert!(entry.get("reason").is_none());
    }

    #[test]
    fn test_failure_entry() {
        let result = InferenceResult::failed(
            "b.png",
            "draw a dog",
            FailureReason::TimedOut,
            "Timeout",
            Some(5.01),
            params(),
        );

        let entry = result.to_entry();
        assert_eq!(entry["filename"], Value::Null);
        assert_eq!(entry["error"], json!("Timeout"));
        assert_eq!(entry["reason"], json!("timed_out"));
        assert_eq!(result.reason(), Some(FailureReason::TimedOut));
    }

    #[test]
    fn test_never_dispatched_has_null_latency() {
        let result = InferenceResult::failed(
            "prompt_0",
            "",
            FailureReason::InputError,
            "No input prompt or image.",
            None,
            Map::new(),
        );
        assert_eq!(result.to_entry()["latency"], Value::Null);
    }

    #[test]
    fn test_manifest_keeps_item_order() {
        let mut manifest = BatchManifest::new();
        for key in ["c.png", "a.png", "b.png"] {
            manifest.push(InferenceResult::failed(
                key,
                "p",
                FailureReason::ServerError,
                "Server error",
                Some(0.1),
                Map::new(),
            ));
        }

        let json = manifest.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["c.png", "a.png", "b.png"]);
        assert_eq!(manifest.failed_count(), 3);
        assert_eq!(manifest.succeeded_count(), 0);
    }
}
