//! 字符偏移与字节下标的换算

/// 字符数（Unicode 标量值）。
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// 将字符偏移换算为字节下标；越界时返回文本字节长度。
pub(crate) fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// 非空且不以换行结尾时需要补一个换行。
pub(crate) fn needs_break(text: &str) -> bool {
    !text.is_empty() && !text.ends_with('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_index_multibyte() {
        let text = "a你b";
        assert_eq!(byte_index(text, 0), 0);
        assert_eq!(byte_index(text, 1), 1);
        assert_eq!(byte_index(text, 2), 4);
        assert_eq!(byte_index(text, 3), 5);
        assert_eq!(byte_index(text, 10), 5);
    }

    #[test]
    fn test_needs_break() {
        assert!(!needs_break(""));
        assert!(!needs_break("a\n"));
        assert!(needs_break("a"));
    }
}
