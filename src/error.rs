//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各模块保留自己的错误枚举（`IngestError`、`ShortcutError`、`SettingsError`、
//! `HostError`），在对外接口处统一上转为 `AppError`，调用侧不需要手写 `map_err`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，并为各模块错误提供 `From` 转换。
//! - 实现 `Serialize` 将错误序列化为字符串，宿主可直接透传给前端。

use serde::Serialize;

use crate::host::HostError;
use crate::ingest::IngestError;
use crate::settings::SettingsError;
use crate::shortcut::ShortcutError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片导入失败
    #[error("{0}")]
    Ingest(#[from] IngestError),

    /// 快捷键解析失败
    #[error("{0}")]
    Shortcut(#[from] ShortcutError),

    /// 设置校验失败
    #[error("{0}")]
    Settings(#[from] SettingsError),

    /// 宿主调用失败
    #[error("宿主调用失败: {0}")]
    Host(#[from] HostError),

    /// 捕获会话不可用
    #[error("捕获会话不可用: {0}")]
    Session(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 事件脚本或设置 JSON 解析失败
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
