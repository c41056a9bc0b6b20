//! 日志脱敏工具
//!
//! # 设计思路
//!
//! 捕获窗口处理的是用户的笔记内容与本地文件路径，日志中不应出现原文。
//! 所有写日志的地方统一通过本模块输出“摘要”：路径只保留末两级，
//! 文本只输出字符数，字节数输出为 B/KB。

use std::path::{Component, Path};

/// 文本长度摘要（按字符计）。
pub fn summarize_text_len(text: &str) -> usize {
    text.chars().count()
}

/// 字节体积摘要，例如 `512B`、`3KB`。
pub fn summarize_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else {
        format!("{}KB", bytes.div_ceil(1024))
    }
}

/// 路径脱敏：仅保留最后两级。
pub fn redact_path(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    redact_parts(&parts)
}

/// 字符串形式的路径脱敏，同时兼容 `/` 与 `\` 分隔符。
pub fn redact_path_str(path: &str) -> String {
    let parts: Vec<String> = path
        .split(['/', '\\'])
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    redact_parts(&parts)
}

fn redact_parts(parts: &[String]) -> String {
    match parts {
        [] => "<unknown>".to_string(),
        [only] => only.clone(),
        [.., parent, last] => format!(".../{}/{}", parent, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_bytes() {
        assert_eq!(summarize_bytes(0), "0B");
        assert_eq!(summarize_bytes(1023), "1023B");
        assert_eq!(summarize_bytes(1024), "1KB");
        assert_eq!(summarize_bytes(1025), "2KB");
    }

    #[test]
    fn test_redact_path_keeps_tail() {
        assert_eq!(
            redact_path(Path::new("/Users/me/Vault/Screenshots/a.png")),
            ".../Screenshots/a.png"
        );
        assert_eq!(redact_path(Path::new("a.png")), "a.png");
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_redact_path_str_mixed_separators() {
        assert_eq!(redact_path_str(r"C:\Users\me\Pictures\b.jpg"), ".../Pictures/b.jpg");
        assert_eq!(redact_path_str(""), "<unknown>");
    }

    #[test]
    fn test_summarize_text_len_counts_chars() {
        assert_eq!(summarize_text_len("héllo"), 5);
    }
}
