//! Generation Context - 生成参数

use serde_json::{Map, Number, Value};

/// 请求体中由显式字段占用的键
///
/// extras 中出现同名键时，以显式字段为准
pub const RESERVED_KEYS: &[&str] = &[
    "image",
    "prompt",
    "seed",
    "width",
    "height",
    "guidance_scale",
    "num_inference_steps",
    "negative_prompt",
    "batch",
];

/// 图像生成参数
///
/// 已知字段显式建模，其余前向兼容字段放入 `extras`，序列化时平铺到请求体
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    /// 随机种子
    pub seed: Option<i64>,
    /// 输出宽度（像素）
    pub width: Option<u32>,
    /// 输出高度（像素）
    pub height: Option<u32>,
    /// CFG 引导系数
    pub guidance_scale: Option<f64>,
    /// 推理步数
    pub num_inference_steps: Option<u32>,
    /// 反向提示词
    pub negative_prompt: Option<String>,
    /// 单次请求生成的图片数量
    pub batch: Option<u32>,
    /// 扩展字段
    pub extras: Map<String, Value>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// 将 batch 限制在 [1, max_batch] 区间内
    pub fn clamp_batch(&mut self, max_batch: u32) {
        let max_batch = max_batch.max(1);
        self.batch = Some(self.batch.unwrap_or(1).clamp(1, max_batch));
    }

    /// 平铺为 JSON 字段（extras 在前，显式字段覆盖同名键）
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.extras.clone();

        if let Some(seed) = self.seed {
            fields.insert("seed".to_string(), Value::from(seed));
        }
        if let Some(width) = self.width {
            fields.insert("width".to_string(), Value::from(width));
        }
        if let Some(height) = self.height {
            fields.insert("height".to_string(), Value::from(height));
        }
        if let Some(scale) = self.guidance_scale {
            // NaN/Inf 无法表示为 JSON 数字，直接丢弃
            if let Some(number) = Number::from_f64(scale) {
                fields.insert("guidance_scale".to_string(), Value::Number(number));
            }
        }
        if let Some(steps) = self.num_inference_steps {
            fields.insert("num_inference_steps".to_string(), Value::from(steps));
        }
        if let Some(negative) = &self.negative_prompt {
            fields.insert("negative_prompt".to_string(), Value::from(negative.clone()));
        }
        if let Some(batch) = self.batch {
            fields.insert("batch".to_string(), Value::from(batch));
        }

        fields
    }
}

/// 解析 `key=value` 形式的扩展参数
///
/// value 能按 JSON 解析时保留其类型（数字、布尔、数组等），否则作为字符串
pub fn parse_extra(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }

    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_fields_override_extras() {
        let params = GenerationParams::new()
            .with_seed(7)
            .with_extra("seed", json!(99))
            .with_extra("true_cfg_scale", json!(4.0));

        let fields = params.to_fields();
        assert_eq!(fields["seed"], json!(7));
        assert_eq!(fields["true_cfg_scale"], json!(4.0));
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let fields = GenerationParams::new().to_fields();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_clamp_batch() {
        let mut params = GenerationParams {
            batch: Some(12),
            ..Default::default()
        };
        params.clamp_batch(4);
        assert_eq!(params.batch, Some(4));

        let mut params = GenerationParams::default();
        params.clamp_batch(4);
        assert_eq!(params.batch, Some(1));
    }

    #[test]
    fn test_parse_extra() {
        assert_eq!(parse_extra("steps=30").unwrap(), ("steps".to_string(), json!(30)));
        assert_eq!(
            parse_extra("aspect_ratio=16:9").unwrap(),
            ("aspect_ratio".to_string(), json!("16:9"))
        );
        assert!(parse_extra("novalue").is_err());
        assert!(parse_extra("=3").is_err());
    }
}
