//! 宿主协作接口
//!
//! 捕获引擎本身不做文件写入、笔记落盘与窗口管理，这些由宿主（桌面壳或测试替身）提供。
//! 所有调用都是异步的，失败以 `HostError` 返回给调用方，引擎负责提示与状态恢复。
//!
//! # 设计思路
//!
//! - 使用 trait 约束宿主能力，引擎对宿主类型泛型化，测试时注入内存实现；
//! - 返回的 future 要求 `Send`，以便在 tokio 任务中并发执行；
//! - `runtime_available` 表示宿主运行时是否就绪，字节类导入依赖它。

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::settings::SettingsSnapshot;

/// 宿主保存图片后的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedImage {
    /// 插入到正文的 Markdown 引用，例如 `![[shot.png|600]]`
    pub markdown: String,
    pub saved_path: String,
    pub filename: String,
}

/// 宿主调用失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<String> for HostError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl SavedImage {
    /// 按笔记库的嵌入语法生成引用：`![[name|width]]`，未设置宽度时省略 `|width`。
    pub fn embed_markdown(filename: &str, width: Option<&str>) -> String {
        match width.map(str::trim).filter(|w| !w.is_empty()) {
            Some(width) => format!("![[{}|{}]]", filename, width),
            None => format!("![[{}]]", filename),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// 宿主能力集合。
pub trait CaptureHost: Send + Sync + 'static {
    /// 宿主运行时是否可用。
    fn runtime_available(&self) -> bool {
        true
    }

    /// 是否由宿主直接上报原生拖放事件（否则退回 DOM 事件）。
    fn native_drag_available(&self) -> bool {
        self.runtime_available()
    }

    /// 按文件系统路径保存图片。
    fn save_image(&self, path: &str) -> impl Future<Output = HostResult<SavedImage>> + Send;

    /// 保存 base64 编码的图片内容。
    fn save_image_from_bytes(
        &self,
        base64_data: String,
        filename: &str,
    ) -> impl Future<Output = HostResult<SavedImage>> + Send;

    /// 读取当前设置。
    fn load_settings(&self) -> impl Future<Output = HostResult<SettingsSnapshot>> + Send;

    /// 追加到今日日记。
    fn append_to_daily_note(&self, text: &str) -> impl Future<Output = HostResult<()>> + Send;

    /// 另存为新笔记，返回笔记标识。
    fn save_as_note(&self, text: &str) -> impl Future<Output = HostResult<String>> + Send;

    fn hide_capture(&self) -> impl Future<Output = HostResult<()>> + Send;

    fn open_settings(&self) -> impl Future<Output = HostResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_markdown() {
        assert_eq!(SavedImage::embed_markdown("a.png", Some("600")), "![[a.png|600]]");
        assert_eq!(SavedImage::embed_markdown("a.png", Some("  ")), "![[a.png]]");
        assert_eq!(SavedImage::embed_markdown("a.png", None), "![[a.png]]");
    }

    #[test]
    fn test_saved_image_uses_camel_case() {
        let saved: SavedImage = serde_json::from_str(
            r#"{"markdown":"![[a.png]]","savedPath":"/v/a.png","filename":"a.png"}"#,
        )
        .expect("saved image should parse");
        assert_eq!(saved.saved_path, "/v/a.png");
    }
}
