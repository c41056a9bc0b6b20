//! # 拖放条目与数据源
//!
//! ## 设计思路
//!
//! 将“拖放事件交来的原始条目”与“流水线实际使用的数据源”解耦：
//! - `DropEntry` 保留事件侧的全部信息（文件名、可能存在的路径、可能可读的字节）
//! - `EntrySource` 是判定后的唯一来源：有路径走宿主路径保存，否则走字节保存
//!
//! 字节读取在事件侧完成，读取失败以 `EntryBytes::Unreadable` 记录原因，
//! 流水线将其归类为编码失败。

use bytes::Bytes;
use serde::Serialize;

use super::IngestError;

/// 条目字节的读取结果。
#[derive(Debug, Clone)]
pub enum EntryBytes {
    Ready(Bytes),
    Unreadable(String),
}

/// 一次拖放中的单个条目。
#[derive(Debug, Clone)]
pub struct DropEntry {
    pub filename: String,
    pub path: Option<String>,
    pub bytes: Option<EntryBytes>,
}

impl DropEntry {
    /// 由宿主解析出的文件系统路径构造。
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let filename = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self {
            filename,
            path: Some(path),
            bytes: None,
        }
    }

    /// 由浏览器侧读取到的文件内容构造。
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            path: None,
            bytes: Some(EntryBytes::Ready(bytes.into())),
        }
    }

    /// 文件内容无法读取的条目。
    pub fn unreadable(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            path: None,
            bytes: Some(EntryBytes::Unreadable(reason.into())),
        }
    }

    /// 附加文件系统路径（部分运行时会同时给出路径与内容）。
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// 用于分类与提示的文件名。
    pub fn display_name(&self) -> &str {
        if !self.filename.is_empty() {
            return &self.filename;
        }
        self.path
            .as_deref()
            .and_then(|p| p.rsplit(['/', '\\']).next())
            .unwrap_or("")
    }

    /// 判定实际数据源：有非空路径走路径，否则使用已读取的字节。
    pub fn resolve(self) -> Result<EntrySource, IngestError> {
        let filename = self.display_name().to_string();

        if let Some(path) = self.path.filter(|p| !p.trim().is_empty()) {
            return Ok(EntrySource::Path { path, filename });
        }

        match self.bytes {
            Some(EntryBytes::Ready(bytes)) if !bytes.is_empty() => {
                Ok(EntrySource::Bytes { bytes, filename })
            }
            Some(EntryBytes::Ready(_)) => Err(IngestError::EncodingFailure(format!(
                "{} 内容为空",
                filename
            ))),
            Some(EntryBytes::Unreadable(reason)) => Err(IngestError::EncodingFailure(reason)),
            None => Err(IngestError::EncodingFailure(format!(
                "{} 既没有路径也没有内容",
                filename
            ))),
        }
    }
}

/// 流水线使用的数据源。
#[derive(Debug, Clone)]
pub enum EntrySource {
    Path { path: String, filename: String },
    Bytes { bytes: Bytes, filename: String },
}

impl EntrySource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Path { .. } => SourceKind::Path,
            Self::Bytes { .. } => SourceKind::Bytes,
        }
    }
}

/// 记录最终来源类型，UI 据此决定预览方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Path,
    Bytes,
}
