//! Prompt Context - 提示词解析
//!
//! 纯函数：同一 (spec, items) 输入总是得到相同的映射

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::{PromptMapping, PromptResolutionError, PromptSpec, PromptValue};
use crate::domain::batch::{synthetic_key, Item};

/// 将提示词规格解析为 条目 key → 提示词 的映射
///
/// - 条目为空时为纯提示词模式，结果中的 key 为合成 id
/// - 任一条目缺少提示词时报告全部缺失条目
pub fn resolve(spec: &PromptSpec, items: &[Item]) -> Result<PromptMapping, PromptResolutionError> {
    match spec {
        PromptSpec::Literal(prompt) => Ok(resolve_literal(prompt, items)),
        PromptSpec::List(prompts) => resolve_list(prompts, items),
        PromptSpec::Mapping(entries) => resolve_mapping(entries, items),
        PromptSpec::File(path) => resolve_file(path, items),
    }
}

fn resolve_literal(prompt: &str, items: &[Item]) -> PromptMapping {
    if items.is_empty() {
        return PromptMapping::from_entries(vec![(synthetic_key(0), prompt.to_string())]);
    }

    PromptMapping::from_entries(
        items
            .iter()
            .map(|item| (item.key().to_string(), prompt.to_string()))
            .collect(),
    )
}

fn resolve_list(prompts: &[String], items: &[Item]) -> Result<PromptMapping, PromptResolutionError> {
    if !items.is_empty() {
        return Err(PromptResolutionError::invalid(
            "提示词列表只能用于纯提示词模式（不能与输入图像同时使用）",
        ));
    }
    if prompts.is_empty() {
        return Err(PromptResolutionError::invalid("提示词列表为空"));
    }

    Ok(PromptMapping::from_entries(
        prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| (synthetic_key(i), prompt.clone()))
            .collect(),
    ))
}

fn resolve_mapping(
    entries: &[(String, PromptValue)],
    items: &[Item],
) -> Result<PromptMapping, PromptResolutionError> {
    if items.is_empty() {
        return Err(PromptResolutionError::invalid(
            "键值映射需要输入图像；纯提示词模式请使用列表或文本文件",
        ));
    }

    let index = ItemIndex::new(items);
    let mut assigned: HashMap<usize, String> = HashMap::new();

    for (key, value) in entries {
        let matches = index.lookup(key);

        if !matches.is_empty() {
            // key 标识条目，value 为提示词
            match value {
                PromptValue::One(prompt) => {
                    for &i in &matches {
                        assigned.insert(i, prompt.clone());
                    }
                }
                PromptValue::Many(prompts) => {
                    if prompts.is_empty() {
                        return Err(PromptResolutionError::invalid(format!(
                            "条目 {} 的提示词列表为空",
                            key
                        )));
                    }
                    for (pos, &i) in matches.iter().enumerate() {
                        assigned.insert(i, prompts[pos % prompts.len()].clone());
                    }
                }
            }
        } else {
            // 角色互换：key 为提示词，value 标识条目
            let targets: Vec<&str> = match value {
                PromptValue::One(target) => vec![target.as_str()],
                PromptValue::Many(targets) => targets.iter().map(String::as_str).collect(),
            };
            for target in targets {
                for i in index.lookup(target) {
                    assigned.insert(i, key.clone());
                }
            }
        }
    }

    finalize(items, |i| assigned.get(&i).cloned())
}

fn resolve_file(path: &Path, items: &[Item]) -> Result<PromptMapping, PromptResolutionError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Prompt path does not exist, using it as a literal prompt");
        return Ok(resolve_literal(&path.to_string_lossy(), items));
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path).map_err(|e| PromptResolutionError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match extension.as_str() {
        "txt" => resolve_lines(path, &content, items),
        "json" => {
            let value: Value =
                serde_json::from_str(&content).map_err(|e| PromptResolutionError::FileParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            resolve_structured(path, &value, items)
        }
        "yaml" | "yml" => {
            let value: Value =
                serde_yaml::from_str(&content).map_err(|e| PromptResolutionError::FileParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            resolve_structured(path, &value, items)
        }
        other => Err(PromptResolutionError::invalid(format!(
            "不支持的提示词文件类型: .{} ({})",
            other,
            path.display()
        ))),
    }
}

fn resolve_lines(
    path: &Path,
    content: &str,
    items: &[Item],
) -> Result<PromptMapping, PromptResolutionError> {
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        return Err(PromptResolutionError::invalid(format!(
            "提示词文件没有非空行: {}",
            path.display()
        )));
    }

    if items.is_empty() {
        return resolve_list(&lines, items);
    }

    Ok(PromptMapping::from_entries(
        items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key().to_string(), lines[i % lines.len()].clone()))
            .collect(),
    ))
}

fn resolve_structured(
    path: &Path,
    value: &Value,
    items: &[Item],
) -> Result<PromptMapping, PromptResolutionError> {
    if !value.is_object() {
        return Err(PromptResolutionError::FileParse {
            path: path.to_path_buf(),
            reason: "顶层必须是键值映射".to_string(),
        });
    }

    match PromptSpec::mapping_from_json(value)? {
        PromptSpec::Mapping(entries) => resolve_mapping(&entries, items),
        _ => Err(PromptResolutionError::invalid("结构化提示词必须是键值映射")),
    }
}

/// 按条目顺序收集结果；缺失时报告全部缺失条目
fn finalize<F>(items: &[Item], mut prompt_for: F) -> Result<PromptMapping, PromptResolutionError>
where
    F: FnMut(usize) -> Option<String>,
{
    let mut entries = Vec::with_capacity(items.len());
    let mut missing = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match prompt_for(i) {
            Some(prompt) => entries.push((item.key().to_string(), prompt)),
            None => missing.push(item.key().to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(PromptResolutionError::MissingPrompts { items: missing });
    }

    Ok(PromptMapping::from_entries(entries))
}

// ============================================================================
// 条目索引
// ============================================================================

/// 三级匹配：完整 key → 文件名 → stem，首个命中的层级生效
struct ItemIndex<'a> {
    items: &'a [Item],
}

impl<'a> ItemIndex<'a> {
    fn new(items: &'a [Item]) -> Self {
        Self { items }
    }

    fn lookup(&self, identifier: &str) -> Vec<usize> {
        let tiers: [fn(&Item) -> &str; 3] = [Item::key, Item::name, Item::stem];

        for tier in tiers {
            let matches: Vec<usize> = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| tier(item) == identifier)
                .map(|(i, _)| i)
                .collect();
            if !matches.is_empty() {
                return matches;
            }
        }

        Vec::new()
    }
}
