//! # 导入配置模块
//!
//! ## 设计思路
//!
//! 将“哪些文件可以导入、单个条目允许多大”集中到 `IngestConfig`，
//! 流水线在单次导入内使用同一份配置快照。

/// 默认接受的图片扩展名（小写）。
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// 图片导入配置。
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// 接受的扩展名（小写，不含点号）。
    pub supported_extensions: Vec<String>,
    /// 字节类条目允许的最大体积（字节）。
    pub max_payload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            supported_extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            max_payload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    /// 按文件名扩展名（大小写不敏感）判断是否可导入。
    pub fn accepts(&self, filename: &str) -> bool {
        match extension_of(filename) {
            Some(ext) => self.supported_extensions.iter().any(|s| s.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }

    /// 面向用户的受支持类型说明，例如 `PNG、JPG、JPEG、WEBP、GIF`。
    pub fn describe_supported(&self) -> String {
        self.supported_extensions
            .iter()
            .map(|ext| ext.to_uppercase())
            .collect::<Vec<_>>()
            .join("、")
    }
}

/// 取文件名最后一个点号之后的部分并转小写；隐藏文件（`.png`）不算扩展名。
pub(crate) fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_is_case_insensitive() {
        let config = IngestConfig::default();
        assert!(config.accepts("shot.PNG"));
        assert!(config.accepts("photo.Jpeg"));
        assert!(config.accepts("/Users/me/anim.gif"));
        assert!(!config.accepts("notes.txt"));
        assert!(!config.accepts("README"));
        assert!(!config.accepts(".png"));
    }

    #[test]
    fn test_extension_of_uses_last_segment() {
        assert_eq!(extension_of("a.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("/dir.v2/file"), None);
        assert_eq!(extension_of("C:\\pics\\x.WEBP"), Some("webp".to_string()));
    }

    #[test]
    fn test_describe_supported() {
        assert_eq!(IngestConfig::default().describe_supported(), "PNG、JPG、JPEG、WEBP、GIF");
    }
}
