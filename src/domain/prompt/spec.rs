//! Prompt Context - Value Objects

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::PromptResolutionError;

/// 映射中的值：单个字符串或字符串列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptValue {
    One(String),
    Many(Vec<String>),
}

impl PromptValue {
    /// 从 JSON 值构造；标量转为字符串，数组元素必须为标量
    pub fn from_json(value: &Value) -> Result<Self, PromptResolutionError> {
        match value {
            Value::Array(elements) => elements
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(PromptValue::Many)
                .ok_or_else(|| {
                    PromptResolutionError::invalid("列表值只能包含字符串或数字")
                }),
            other => scalar_to_string(other)
                .map(PromptValue::One)
                .ok_or_else(|| {
                    PromptResolutionError::invalid(format!("不支持的映射值: {}", other))
                }),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 提示词规格
///
/// 在加载时（命令行参数、配置文件）一次性确定形态，解析阶段不再做类型探测
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSpec {
    /// 单个字面提示词
    Literal(String),
    /// 有序提示词列表（仅纯提示词模式）
    List(Vec<String>),
    /// 有序键值映射，键/值的角色在解析时按条目匹配推断
    Mapping(Vec<(String, PromptValue)>),
    /// 提示词文件（.txt / .json / .yaml / .yml）
    File(PathBuf),
}

impl PromptSpec {
    /// 命令行参数：路径存在则视为文件，否则视为字面提示词
    pub fn from_arg(raw: &str) -> Self {
        if Path::new(raw).exists() {
            PromptSpec::File(PathBuf::from(raw))
        } else {
            PromptSpec::Literal(raw.to_string())
        }
    }

    /// 从配置值构造（字符串 / 字符串数组 / 表）
    pub fn from_json(value: &Value) -> Result<Self, PromptResolutionError> {
        match value {
            Value::String(s) => Ok(Self::from_arg(s)),
            Value::Array(elements) => elements
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(PromptSpec::List)
                .ok_or_else(|| PromptResolutionError::invalid("提示词列表只能包含字符串")),
            Value::Object(_) => Self::mapping_from_json(value),
            other => Err(PromptResolutionError::invalid(format!(
                "不支持的提示词规格: {}",
                other
            ))),
        }
    }

    /// 从 JSON 对象构造映射形态（保持键顺序）
    pub fn mapping_from_json(value: &Value) -> Result<Self, PromptResolutionError> {
        let object = value.as_object().ok_or_else(|| {
            PromptResolutionError::invalid("结构化提示词必须是扁平的键值映射")
        })?;

        let entries = object
            .iter()
            .map(|(key, value)| Ok((key.clone(), PromptValue::from_json(value)?)))
            .collect::<Result<Vec<_>, PromptResolutionError>>()?;

        Ok(PromptSpec::Mapping(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_arg_literal_when_path_missing() {
        let spec = PromptSpec::from_arg("a watercolor fox");
        assert_eq!(spec, PromptSpec::Literal("a watercolor fox".to_string()));
    }

    #[test]
    fn test_from_arg_file_when_path_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let raw = file.path().to_string_lossy().to_string();
        assert_eq!(
            PromptSpec::from_arg(&raw),
            PromptSpec::File(file.path().to_path_buf())
        );
    }

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(
            PromptSpec::from_json(&json!(["a", "b"])).unwrap(),
            PromptSpec::List(vec!["a".to_string(), "b".to_string()])
        );

        let mapping = PromptSpec::from_json(&json!({"a.png": "cat", "dog": ["b", "c"]})).unwrap();
        assert_eq!(
            mapping,
            PromptSpec::Mapping(vec![
                ("a.png".to_string(), PromptValue::One("cat".to_string())),
                (
                    "dog".to_string(),
                    PromptValue::Many(vec!["b".to_string(), "c".to_string()])
                ),
            ])
        );

        assert!(PromptSpec::from_json(&json!(3)).is_err());
        assert!(PromptSpec::from_json(&json!({"a": {"nested": 1}})).is_err());
    }
}
