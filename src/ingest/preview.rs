//! # 预览资源管理
//!
//! ## 设计思路
//!
//! 字节类条目在保存后还需要一个本地预览（类似浏览器的 object URL）。
//! 这类预览占用内存，必须显式释放。为了让“谁负责释放”在类型上可见：
//!
//! - `PreviewRegistry::allocate` 返回携带 `PreviewToken` 的句柄；
//! - `PreviewToken` 不可克隆，释放时按值消费，同一预览不可能被释放两次；
//! - 路径类条目使用由保存路径换算出的静态 URL，不占用注册表资源。
//!
//! ## 实现思路
//!
//! 注册表内部是 `Arc<Mutex<..>>`，记录存活预览与分配/释放计数，
//! 供测试与诊断确认没有泄漏。锁中毒时直接恢复内部数据，保证释放不会丢失。

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;

const TRANSIENT_SCHEME: &str = "blob:capture/";
const ASSET_PREFIX: &str = "asset://localhost/";

/// 临时预览的所有权凭证。
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewToken {
    id: u64,
}

impl PreviewToken {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// 预览句柄。
#[derive(Debug)]
pub enum PreviewHandle {
    /// 由注册表分配的临时预览，需要释放。
    Transient {
        token: PreviewToken,
        url: String,
        mime: String,
        dimensions: Option<(u32, u32)>,
    },
    /// 由保存路径换算的静态预览。
    Static { url: String },
}

impl PreviewHandle {
    /// 根据宿主返回的保存路径构造静态预览地址。
    pub fn for_saved_path(saved_path: &str) -> Self {
        Self::Static {
            url: format!("{}{}", ASSET_PREFIX, urlencoding::encode(saved_path)),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Static { url } => url,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// 注册表计数快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreviewStats {
    pub allocated: u64,
    pub released: u64,
    pub outstanding: u64,
    /// 释放了不属于本注册表的凭证
    pub rejected: u64,
}

#[derive(Debug)]
struct PreviewBlob {
    bytes: Bytes,
    mime: String,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<u64, PreviewBlob>,
    allocated: u64,
    released: u64,
    rejected: u64,
}

/// 临时预览注册表。
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("⚠️ 预览注册表锁已中毒，恢复内部数据继续使用");
            poisoned.into_inner()
        })
    }

    /// 为一段图片字节分配临时预览。
    pub fn allocate(&self, bytes: Bytes, filename: &str) -> PreviewHandle {
        let mime = sniff_mime(&bytes, filename);
        let dimensions = read_dimensions(&bytes);

        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.live.insert(
            id,
            PreviewBlob {
                bytes,
                mime: mime.clone(),
            },
        );
        inner.allocated += 1;

        log::debug!("🖼️ 分配临时预览 #{} ({}, {:?})", id, mime, dimensions);

        PreviewHandle::Transient {
            token: PreviewToken { id },
            url: format!("{}{}", TRANSIENT_SCHEME, id),
            mime,
            dimensions,
        }
    }

    /// 释放临时预览，返回是否确实释放了资源。
    pub fn release(&self, token: PreviewToken) -> bool {
        let mut inner = self.lock();
        if inner.live.remove(&token.id).is_some() {
            inner.released += 1;
            log::debug!("释放临时预览 #{}", token.id);
            true
        } else {
            inner.rejected += 1;
            log::warn!("⚠️ 释放未知预览凭证 #{}", token.id);
            false
        }
    }

    /// 释放句柄持有的资源；静态预览无需释放。
    pub fn release_handle(&self, handle: PreviewHandle) -> bool {
        match handle {
            PreviewHandle::Transient { token, .. } => self.release(token),
            PreviewHandle::Static { .. } => false,
        }
    }

    /// 按预览地址取回内容，供宿主的资源协议读取。
    pub fn resolve(&self, url: &str) -> Option<(Bytes, String)> {
        let id: u64 = url.strip_prefix(TRANSIENT_SCHEME)?.parse().ok()?;
        let inner = self.lock();
        inner
            .live
            .get(&id)
            .map(|blob| (blob.bytes.clone(), blob.mime.clone()))
    }

    pub fn stats(&self) -> PreviewStats {
        let inner = self.lock();
        PreviewStats {
            allocated: inner.allocated,
            released: inner.released,
            outstanding: inner.live.len() as u64,
            rejected: inner.rejected,
        }
    }
}

/// 优先按文件头识别 MIME，识别不了再按扩展名推断。
fn sniff_mime(bytes: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }

    let mime = match super::config::extension_of(filename).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    };
    mime.to_string()
}

/// 只读取图片头信息获取宽高，失败时返回 `None`。
fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
