//! Batch Context - 输出文件命名策略
//!
//! 文件名由条目 id 与截断后的提示词组成：`<id>_<prompt>.png`
//! 同一次运行中重复的文件名追加序号后缀（`_1`, `_2`, ...）

use std::collections::HashSet;

/// 提示词部分的最大字符数
pub const MAX_PROMPT_CHARS: usize = 50;

/// 输出文件扩展名
pub const OUTPUT_EXTENSION: &str = "png";

/// 清洗提示词用于文件名
///
/// 规则：仅保留字母数字、空格、`-`、`_`；去除末尾空白；空格替换为 `_`；截断到 50 字符
pub fn sanitize_prompt(prompt: &str) -> String {
    let kept: String = prompt
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    kept.trim_end()
        .replace(' ', "_")
        .chars()
        .take(MAX_PROMPT_CHARS)
        .collect()
}

/// 清洗条目 id：路径分隔符等不安全字符替换为 `_`
pub fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "item".to_string()
    } else {
        cleaned
    }
}

/// 生成安全的 ASCII 文件名（用于 Web 上传与生成结果）
///
/// 非 ASCII 字符被丢弃，空白折叠为 `_`，首尾的 `.`/`_` 被去除
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    filtered.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// 单次运行内的输出文件命名器
#[derive(Debug, Default)]
pub struct OutputNamer {
    used: HashSet<String>,
}

impl OutputNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为条目分配文件名；首次出现的名字原样返回，后续重复追加 `_<n>`
    pub fn next_name(&mut self, item_id: &str, prompt: &str) -> String {
        let id = sanitize_id(item_id);
        let safe_prompt = sanitize_prompt(prompt);
        let base = if safe_prompt.is_empty() {
            id
        } else {
            format!("{}_{}", id, safe_prompt)
        };

        let mut candidate = format!("{}.{}", base, OUTPUT_EXTENSION);
        let mut suffix = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}.{}", base, suffix, OUTPUT_EXTENSION);
            suffix += 1;
        }

        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_prompt() {
        assert_eq!(sanitize_prompt("draw a cat"), "draw_a_cat");
        assert_eq!(sanitize_prompt("a cat, on a mat!  "), "a_cat_on_a_mat");
        assert_eq!(sanitize_prompt("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn test_sanitize_prompt_caps_length() {
        let long = "x".repeat(120);
        assert_eq!(sanitize_prompt(&long).chars().count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("a"), "a");
        assert_eq!(sanitize_id("dir/sub name"), "dir_sub_name");
        assert_eq!(sanitize_id(".."), "item");
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("a cat_1a2b3c4d.png"), "a_cat_1a2b3c4d.png");
    }

    #[test]
    fn test_output_name_for_item() {
        let mut namer = OutputNamer::new();
        assert_eq!(namer.next_name("a", "draw a cat"), "a_draw_a_cat.png");
    }

    #[test]
    fn test_duplicate_names_get_suffix() {
        let mut namer = OutputNamer::new();
        assert_eq!(namer.next_name("prompt_0", "same"), "prompt_0_same.png");
        assert_eq!(namer.next_name("prompt_0", "same"), "prompt_0_same_1.png");
        assert_eq!(namer.next_name("prompt_0", "same!"), "prompt_0_same_2.png");
    }

    #[test]
    fn test_empty_prompt_uses_id_only() {
        let mut namer = OutputNamer::new();
        assert_eq!(namer.next_name("b", "!!!"), "b.png");
    }
}
