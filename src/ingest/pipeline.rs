//! # 导入流水线
//!
//! ## 设计思路
//!
//! 一次拖放交来的条目彼此独立：任一条目失败不影响其他条目，
//! 最终结果按拖放顺序排列，保证插入正文后图片连续且有序。
//!
//! ## 实现思路
//!
//! 1. 所有条目并发派发到 `JoinSet`，每个任务带上自己的序号
//! 2. 单个条目：分类 → 判定来源 → 委托宿主保存 → 生成预览
//! 3. 汇总时按序号回填，统计不支持与失败数量
//!
//! 临时预览在委托宿主之前分配，宿主保存失败时立即释放。

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose;
use tokio::task::JoinSet;

use super::preview::{PreviewHandle, PreviewRegistry};
use super::record::ImageRecord;
use super::source::{DropEntry, EntrySource, SourceKind};
use super::{IngestConfig, IngestError};
use crate::host::CaptureHost;
use crate::log_safety;

/// 单个条目的失败信息。
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFailure {
    pub filename: String,
    pub error: IngestError,
}

/// 一批条目的导入结果。
#[derive(Debug, Default)]
pub struct IngestReport {
    /// 成功记录，按拖放顺序
    pub records: Vec<ImageRecord>,
    pub unsupported: usize,
    pub failed: usize,
    /// 不支持与失败条目的明细，按拖放顺序
    pub failures: Vec<EntryFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 面向用户的汇总提示；全部成功时返回 `None`。
    pub fn summary(&self, config: &IngestConfig) -> Option<String> {
        match (self.unsupported, self.failed) {
            (0, 0) => None,
            (unsupported, 0) => Some(format!(
                "{} 个文件类型不受支持（支持 {}）",
                unsupported,
                config.describe_supported()
            )),
            (0, failed) => Some(self.first_failure_message(failed)),
            (unsupported, failed) => Some(format!(
                "{}；另有 {} 个文件类型不受支持",
                self.first_failure_message(failed),
                unsupported
            )),
        }
    }

    fn first_failure_message(&self, failed: usize) -> String {
        let first = self
            .failures
            .iter()
            .find(|f| !matches!(f.error, IngestError::UnsupportedType(_)));
        match first {
            Some(f) if failed == 1 => format!("{} 导入失败：{}", f.filename, f.error),
            Some(f) => format!("{} 个文件导入失败（首个：{}，{}）", failed, f.filename, f.error),
            None => format!("{} 个文件导入失败", failed),
        }
    }
}

/// 图片导入流水线。
pub struct ImageIngestionPipeline<H> {
    host: Arc<H>,
    previews: PreviewRegistry,
    config: Arc<IngestConfig>,
}

impl<H> Clone for ImageIngestionPipeline<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            previews: self.previews.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: CaptureHost> ImageIngestionPipeline<H> {
    pub fn new(host: Arc<H>, previews: PreviewRegistry, config: IngestConfig) -> Self {
        Self {
            host,
            previews,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// 并发导入一批条目。
    pub async fn ingest(&self, entries: Vec<DropEntry>) -> IngestReport {
        let started = Instant::now();
        let total = entries.len();
        let names: Vec<String> = entries.iter().map(|e| e.display_name().to_string()).collect();

        let mut tasks = JoinSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn(async move { (index, pipeline.ingest_entry(entry).await) });
        }

        let mut slots: Vec<Option<Result<ImageRecord, IngestError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => log::error!("❌ 导入任务异常退出: {}", e),
            }
        }

        let mut report = IngestReport::default();
        for (slot, filename) in slots.into_iter().zip(names) {
            let result = slot.unwrap_or_else(|| {
                Err(IngestError::PersistenceFailure("导入任务异常退出".to_string()))
            });
            match result {
                Ok(record) => report.records.push(record),
                Err(error) => {
                    if matches!(error, IngestError::UnsupportedType(_)) {
                        report.unsupported += 1;
                    } else {
                        report.failed += 1;
                    }
                    log::warn!("⚠️ 条目导入失败 [{}]: {}", error.code(), filename);
                    report.failures.push(EntryFailure { filename, error });
                }
            }
        }

        log::info!(
            "✅ 批次导入完成: 成功 {} / 不支持 {} / 失败 {} / 共 {}，耗时 {}ms",
            report.records.len(),
            report.unsupported,
            report.failed,
            total,
            started.elapsed().as_millis()
        );
        report
    }

    async fn ingest_entry(&self, entry: DropEntry) -> Result<ImageRecord, IngestError> {
        let name = entry.display_name().to_string();
        if !self.config.accepts(&name) {
            return Err(IngestError::UnsupportedType(name));
        }

        match entry.resolve()? {
            EntrySource::Path { path, .. } => {
                log::debug!("按路径保存图片: {}", log_safety::redact_path_str(&path));
                let saved = self
                    .host
                    .save_image(&path)
                    .await
                    .map_err(|e| IngestError::PersistenceFailure(e.to_string()))?;
                let preview = PreviewHandle::for_saved_path(&saved.saved_path);
                Ok(ImageRecord::new(saved, preview, SourceKind::Path))
            }
            EntrySource::Bytes { bytes, filename } => {
                if bytes.len() > self.config.max_payload_bytes {
                    return Err(IngestError::ResourceLimit(format!(
                        "{} 超过 {} 上限",
                        log_safety::summarize_bytes(bytes.len()),
                        log_safety::summarize_bytes(self.config.max_payload_bytes)
                    )));
                }
                if !self.host.runtime_available() {
                    return Err(IngestError::NoRuntime);
                }

                let encoded = general_purpose::STANDARD.encode(&bytes);
                log::debug!(
                    "按内容保存图片: {} ({})",
                    filename,
                    log_safety::summarize_bytes(bytes.len())
                );

                let preview = self.previews.allocate(bytes, &filename);
                match self.host.save_image_from_bytes(encoded, &filename).await {
                    Ok(saved) => Ok(ImageRecord::new(saved, preview, SourceKind::Bytes)),
                    Err(e) => {
                        self.previews.release_handle(preview);
                        Err(IngestError::PersistenceFailure(e.to_string()))
                    }
                }
            }
        }
    }
}
