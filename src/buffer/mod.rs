//! 捕获缓冲区管理
//!
//! 维护捕获窗口的正文、光标与已导入的图片记录，并把每次变化发布为
//! `BufferSnapshot`。
//!
//! # 设计思路
//!
//! - 缓冲区是图片记录的唯一持有者，也是临时预览的唯一释放方；
//! - 每次 `reset` 递增 `generation`，异步导入完成时据此判断结果是否过期；
//! - 偏移量一律按字符计，内部再换算为字节下标。
//!
//! # 实现思路
//!
//! 快照通过 `tokio::sync::watch` 发布，UI 只关心最新状态；
//! 一次操作无论改动多少内容，只发布一次。

mod text;

use serde::Serialize;
use tokio::sync::watch;

use crate::ingest::{ImageRecord, ImageRecordView, PreviewRegistry};
use text::{byte_index, char_len, needs_break};

/// 缓冲区快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSnapshot {
    pub text: String,
    pub caret: Option<usize>,
    pub generation: u64,
    pub images: Vec<ImageRecordView>,
}

/// 捕获缓冲区。
#[derive(Debug)]
pub struct CaptureBufferManager {
    text: String,
    caret: Option<usize>,
    records: Vec<ImageRecord>,
    generation: u64,
    previews: PreviewRegistry,
    publisher: watch::Sender<BufferSnapshot>,
}

impl CaptureBufferManager {
    pub fn new(previews: PreviewRegistry) -> Self {
        let (publisher, _) = watch::channel(BufferSnapshot::default());
        Self {
            text: String::new(),
            caret: None,
            records: Vec::new(),
            generation: 0,
            previews,
            publisher,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> Option<usize> {
        self.caret
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// 按批次顺序插入图片引用，返回最终光标位置。
    ///
    /// 每条引用独占一行：插入点前面不是行首时先补换行，引用本身以换行结尾。
    pub fn insert_images(&mut self, records: Vec<ImageRecord>, at: usize) -> usize {
        if records.is_empty() {
            return at.min(char_len(&self.text));
        }

        let mut position = at.min(char_len(&self.text));
        let count = records.len();

        for record in records {
            let insertion = format!("{}\n", record.markdown_ref);

            if position >= char_len(&self.text) {
                if needs_break(&self.text) {
                    self.text.push('\n');
                }
                self.text.push_str(&insertion);
                position = char_len(&self.text);
            } else {
                let byte = byte_index(&self.text, position);
                let piece = if needs_break(&self.text[..byte]) {
                    format!("\n{}", insertion)
                } else {
                    insertion
                };
                self.text.insert_str(byte, &piece);
                position += char_len(&piece);
            }

            self.records.push(record);
        }

        self.caret = Some(position);
        log::info!("🖼️ 已插入 {} 张图片，光标移至 {}", count, position);
        self.publish();
        position
    }

    /// 移除图片记录并释放预览；未知 id 不做任何事。
    ///
    /// 正文中的引用文本保持原样，由用户自行编辑。
    pub fn remove_image(&mut self, id: &str) -> bool {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = self.records.remove(index);
        record.release(&self.previews);
        self.publish();
        true
    }

    /// 清空正文与记录，释放全部临时预览并进入新一代。
    pub fn reset(&mut self) {
        let released = self.release_all();
        self.text.clear();
        self.caret = None;
        self.generation += 1;
        log::debug!(
            "缓冲区已重置（generation={}, 释放预览 {}）",
            self.generation,
            released
        );
        self.publish();
    }

    /// 用户编辑后同步正文与光标。
    pub fn set_text(&mut self, text: impl Into<String>, caret: Option<usize>) {
        self.text = text.into();
        self.caret = caret.map(|c| c.min(char_len(&self.text)));
        self.publish();
    }

    pub fn set_caret(&mut self, caret: Option<usize>) {
        let caret = caret.map(|c| c.min(char_len(&self.text)));
        if caret != self.caret {
            self.caret = caret;
            self.publish();
        }
    }

    /// 在光标处（未知时在末尾另起一行）插入一段文本，返回新光标位置。
    pub fn insert_text(&mut self, text: &str) -> usize {
        if text.is_empty() {
            return self.caret.unwrap_or_else(|| char_len(&self.text));
        }

        let position = match self.caret {
            Some(caret) => {
                let byte = byte_index(&self.text, caret);
                self.text.insert_str(byte, text);
                caret + char_len(text)
            }
            None => {
                if needs_break(&self.text) {
                    self.text.push('\n');
                }
                self.text.push_str(text);
                char_len(&self.text)
            }
        };

        self.caret = Some(position);
        self.publish();
        position
    }

    /// 提交用的正文：去掉首尾空白，空内容返回 `None`。
    pub fn submission_text(&self) -> Option<String> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            text: self.text.clone(),
            caret: self.caret,
            generation: self.generation,
            images: self.records.iter().map(ImageRecord::view).collect(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BufferSnapshot> {
        self.publisher.subscribe()
    }

    fn release_all(&mut self) -> usize {
        let previews = &self.previews;
        self.records
            .drain(..)
            .map(|record| record.release(previews))
            .filter(|released| *released)
            .count()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }
}

impl Drop for CaptureBufferManager {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            log::debug!("缓冲区销毁，释放预览 {}", released);
        }
    }
}
