//! # 图片记录
//!
//! 成功导入的条目形成 `ImageRecord`：保存结果 + 预览句柄 + 唯一标识。
//! 记录持有预览所有权，因此不可克隆；对外展示使用 `ImageRecordView`。

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::preview::{PreviewHandle, PreviewRegistry};
use super::source::SourceKind;
use crate::host::SavedImage;

static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// 生成记录标识：毫秒时间戳 + 进程内递增序号 + 随机后缀。
///
/// 同一毫秒内的多次导入依靠序号保证唯一。
pub fn next_record_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = RECORD_SEQ.fetch_add(1, Ordering::Relaxed);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("img-{}-{}-{}", millis, seq, &suffix[..8])
}

/// 已导入的图片。
#[derive(Debug)]
pub struct ImageRecord {
    pub id: String,
    pub filename: String,
    pub markdown_ref: String,
    pub saved_path: String,
    pub preview: PreviewHandle,
    pub source_kind: SourceKind,
}

impl ImageRecord {
    pub fn new(saved: SavedImage, preview: PreviewHandle, source_kind: SourceKind) -> Self {
        Self {
            id: next_record_id(),
            filename: saved.filename,
            markdown_ref: saved.markdown,
            saved_path: saved.saved_path,
            preview,
            source_kind,
        }
    }

    /// 丢弃记录并释放其临时预览。
    pub fn release(self, previews: &PreviewRegistry) -> bool {
        previews.release_handle(self.preview)
    }

    pub fn view(&self) -> ImageRecordView {
        ImageRecordView {
            id: self.id.clone(),
            filename: self.filename.clone(),
            markdown_ref: self.markdown_ref.clone(),
            preview_url: self.preview.url().to_string(),
            source_kind: self.source_kind,
        }
    }
}

/// 记录的只读视图，供 UI 渲染图库。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecordView {
    pub id: String,
    pub filename: String,
    pub markdown_ref: String,
    pub preview_url: String,
    pub source_kind: SourceKind,
}
