//! # 图片导入模块（ingest）
//!
//! ## 设计思路
//!
//! 将“拖放条目 → 分类 → 判定来源 → 委托宿主保存 → 生成预览”按职责拆分：
//!
//! - `config`：可导入类型与体积上限
//! - `error`：单条目错误模型
//! - `source`：拖放条目与判定后的数据源
//! - `preview`：临时预览的分配与释放
//! - `record`：导入成功后的图片记录
//! - `pipeline`：并发编排与结果汇总
//!
//! ## 调用链
//!
//! ```text
//! DragDropTracker 产出 DropBatch
//!    ↓
//! pipeline.rs（并发派发 + 按序汇总）
//!    ├─ config.rs（扩展名分类）
//!    ├─ source.rs（路径优先，其次字节）
//!    ├─ CaptureHost（save_image / save_image_from_bytes）
//!    └─ preview.rs（静态地址或临时预览）
//!    ↓
//! IngestReport 交给缓冲区插入
//! ```

mod config;
mod error;
mod pipeline;
mod preview;
mod record;
mod source;

pub use config::{DEFAULT_EXTENSIONS, IngestConfig};
pub use error::IngestError;
pub use pipeline::{EntryFailure, ImageIngestionPipeline, IngestReport};
pub use preview::{PreviewHandle, PreviewRegistry, PreviewStats, PreviewToken};
pub use record::{ImageRecord, ImageRecordView, next_record_id};
pub use source::{DropEntry, EntryBytes, EntrySource, SourceKind};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CaptureHost, HostError, HostResult, SavedImage};
    use crate::settings::SettingsSnapshot;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 按文件名决定成败的宿主替身；文件名越靠前保存越慢，用于检验结果顺序。
    #[derive(Default)]
    struct StubHost {
        offline: bool,
        saves: AtomicUsize,
    }

    impl StubHost {
        fn saved(filename: &str, dir: &str) -> SavedImage {
            SavedImage {
                markdown: format!("![[{}]]", filename),
                saved_path: format!("{}/{}", dir, filename),
                filename: filename.to_string(),
            }
        }
    }

    impl CaptureHost for StubHost {
        fn runtime_available(&self) -> bool {
            !self.offline
        }

        async fn save_image(&self, path: &str) -> HostResult<SavedImage> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            let filename = path.rsplit('/').next().unwrap_or(path).to_string();
            if filename.starts_with("fail") {
                return Err(HostError::from("disk full"));
            }
            let delay = filename.len() as u64;
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(delay))).await;
            Ok(Self::saved(&filename, "/vault/assets"))
        }

        async fn save_image_from_bytes(
            &self,
            base64_data: String,
            filename: &str,
        ) -> HostResult<SavedImage> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if base64_data.is_empty() || filename.starts_with("fail") {
                return Err(HostError::from("rejected"));
            }
            Ok(Self::saved(filename, "/vault/assets"))
        }

        async fn load_settings(&self) -> HostResult<SettingsSnapshot> {
            Ok(SettingsSnapshot::default())
        }

        async fn append_to_daily_note(&self, _text: &str) -> HostResult<()> {
            Ok(())
        }

        async fn save_as_note(&self, _text: &str) -> HostResult<String> {
            Ok("note".to_string())
        }

        async fn hide_capture(&self) -> HostResult<()> {
            Ok(())
        }

        async fn open_settings(&self) -> HostResult<()> {
            Ok(())
        }
    }

    fn pipeline(host: StubHost) -> ImageIngestionPipeline<StubHost> {
        ImageIngestionPipeline::new(Arc::new(host), PreviewRegistry::new(), IngestConfig::default())
    }

    #[tokio::test]
    async fn test_batch_keeps_drop_order_and_counts() {
        let pipeline = pipeline(StubHost::default());

        let report = pipeline
            .ingest(vec![
                DropEntry::from_path("/tmp/a.png"),
                DropEntry::from_path("/tmp/notes.txt"),
                DropEntry::from_path("/tmp/fail.jpg"),
                DropEntry::from_bytes("c.gif", vec![1u8, 2, 3]),
                DropEntry::from_path("/tmp/longer-name-b.webp"),
            ])
            .await;

        let names: Vec<_> = report.records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.gif", "longer-name-b.webp"]);
        assert_eq!(report.unsupported, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.records.len(), 5 - report.unsupported - report.failed);
        assert_eq!(report.failures[0].error, IngestError::UnsupportedType("notes.txt".to_string()));
        assert_eq!(report.records[1].source_kind, SourceKind::Bytes);
        assert!(report.records[1].preview.is_transient());
        assert_eq!(
            report.records[0].preview.url(),
            "asset://localhost/%2Fvault%2Fassets%2Fa.png"
        );
    }

    #[tokio::test]
    async fn test_unsupported_entries_never_reach_host() {
        let host = Arc::new(StubHost::default());
        let pipeline = ImageIngestionPipeline::new(
            Arc::clone(&host),
            PreviewRegistry::new(),
            IngestConfig::default(),
        );

        let report = pipeline
            .ingest(vec![DropEntry::from_path("/tmp/a.pdf"), DropEntry::from_bytes("b", vec![1u8])])
            .await;

        assert_eq!(report.unsupported, 2);
        assert_eq!(host.saves.load(Ordering::SeqCst), 0);
        assert!(report.summary(pipeline.config()).is_some());
    }

    #[tokio::test]
    async fn test_bytes_without_runtime_fail_with_no_runtime() {
        let pipeline = pipeline(StubHost {
            offline: true,
            ..StubHost::default()
        });

        let report = pipeline.ingest(vec![DropEntry::from_bytes("a.png", vec![1u8])]).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].error, IngestError::NoRuntime);
        assert_eq!(pipeline.previews().stats().allocated, 0);
    }

    #[tokio::test]
    async fn test_failed_save_releases_transient_preview() {
        let pipeline = pipeline(StubHost::default());

        let report = pipeline
            .ingest(vec![DropEntry::from_bytes("fail.png", vec![9u8; 16])])
            .await;

        assert_eq!(report.failed, 1);
        assert!(matches!(report.failures[0].error, IngestError::PersistenceFailure(_)));
        let stats = pipeline.previews().stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.outstanding, 0);
    }

    #[tokio::test]
    async fn test_oversized_payload_hits_resource_limit() {
        let pipeline = ImageIngestionPipeline::new(
            Arc::new(StubHost::default()),
            PreviewRegistry::new(),
            IngestConfig {
                max_payload_bytes: 4,
                ..IngestConfig::default()
            },
        );

        let report = pipeline.ingest(vec![DropEntry::from_bytes("a.png", vec![0u8; 5])]).await;

        assert_eq!(report.failures[0].error.code(), "resource_limit");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pipeline = pipeline(StubHost::default());
        let report = pipeline.ingest(Vec::new()).await;
        assert!(report.records.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.summary(pipeline.config()), None);
    }
}
