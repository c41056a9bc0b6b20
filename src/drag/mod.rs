//! 拖放状态跟踪模块
//!
//! 将两路拖放事件源（DOM 事件 / 宿主原生事件）归一为同一个状态机，
//! 并在 `drop` 时产出一批待导入的条目。
//!
//! # 设计思路
//!
//! 嵌套元素会让 DOM 的 `enter/leave` 成对但交错地出现：指针从容器移入子元素时，
//! 先收到子元素的 `enter`，再收到容器的 `leave`。单纯以 `leave` 判断离开会让
//! 拖放高亮闪烁，因此用嵌套计数 + 坐标校验共同判断：
//!
//! - 只有当指针确实落在容器外，或事件来自文档根时，`leave` 才强制复位；
//! - 计数减到 0 但指针仍在容器内时，阶段保持不变；
//! - 只处理外层容器捕获阶段的事件，冒泡阶段的重复事件直接忽略。
//!
//! 宿主原生事件不存在嵌套问题，`leave` 总是直接复位。
//!
//! # 实现思路
//!
//! - 同一时刻只绑定一个事件源，由 `attach` 选择，`detach` 解绑并复位；
//! - 状态变化通过 `tokio::sync::watch` 发布，UI 只需订阅最新值；
//! - `drop` 先发布 `Dropped`，随即复位为 `Idle`，保证不会停留在非空闲状态。

mod event;

pub use event::{DomDragEvent, DomDragKind, ListenerPhase, NativeDragEvent, Point, Rect};

use serde::Serialize;
use tokio::sync::watch;

use crate::ingest::DropEntry;

/// 拖放阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPhase {
    #[default]
    Idle,
    Entering,
    Over,
    Dropped,
}

/// 拖放状态：阶段 + 嵌套计数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DragState {
    pub phase: DragPhase,
    pub nesting: u32,
}

impl DragState {
    /// UI 是否应显示拖放高亮。
    pub fn is_active(&self) -> bool {
        matches!(self.phase, DragPhase::Entering | DragPhase::Over)
    }
}

/// 事件源类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragSourceKind {
    Dom,
    Native,
}

/// 一次 `drop` 产出的条目批次。
#[derive(Debug)]
pub struct DropBatch {
    pub entries: Vec<DropEntry>,
    pub point: Option<Point>,
    pub source: DragSourceKind,
}

/// 拖放状态机。
#[derive(Debug)]
pub struct DragDropTracker {
    source: Option<DragSourceKind>,
    bounds: Option<Rect>,
    state: DragState,
    publisher: watch::Sender<DragState>,
}

impl Default for DragDropTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DragDropTracker {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(DragState::default());
        Self {
            source: None,
            bounds: None,
            state: DragState::default(),
            publisher,
        }
    }

    /// 绑定事件源；重复绑定会先解绑旧源。
    pub fn attach(&mut self, source: DragSourceKind, bounds: Option<Rect>) {
        if self.source.is_some() {
            self.detach();
        }
        self.source = Some(source);
        self.bounds = bounds;
        log::debug!("🎯 拖放事件源已绑定: {:?}", source);
    }

    /// 解绑事件源并复位状态。
    pub fn detach(&mut self) {
        if let Some(source) = self.source.take() {
            log::debug!("拖放事件源已解绑: {:?}", source);
        }
        self.reset();
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = Some(bounds);
    }

    pub fn source(&self) -> Option<DragSourceKind> {
        self.source
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<DragState> {
        self.publisher.subscribe()
    }

    /// 处理 DOM 拖放事件。
    pub fn handle_dom(&mut self, event: DomDragEvent) -> Option<DropBatch> {
        if self.source != Some(DragSourceKind::Dom) {
            log::trace!("未绑定 DOM 事件源，忽略 {:?}", event.kind);
            return None;
        }
        if event.phase == ListenerPhase::Bubble {
            return None;
        }

        match event.kind {
            DomDragKind::Enter => {
                self.enter();
                None
            }
            DomDragKind::Over => {
                self.over();
                None
            }
            DomDragKind::Leave => {
                self.state.nesting = self.state.nesting.saturating_sub(1);
                let outside = match (event.point, self.bounds) {
                    (Some(point), Some(bounds)) => !bounds.contains(point),
                    _ => false,
                };
                if outside || event.at_document_root {
                    self.reset();
                } else {
                    self.publish();
                }
                None
            }
            DomDragKind::Drop => Some(self.finish(event.files, event.point, DragSourceKind::Dom)),
        }
    }

    /// 处理宿主原生拖放事件。
    pub fn handle_native(&mut self, event: NativeDragEvent) -> Option<DropBatch> {
        if self.source != Some(DragSourceKind::Native) {
            log::trace!("未绑定原生事件源，忽略事件");
            return None;
        }

        match event {
            NativeDragEvent::Enter { .. } => {
                self.enter();
                None
            }
            NativeDragEvent::Over { .. } => {
                self.over();
                None
            }
            NativeDragEvent::Leave => {
                self.reset();
                None
            }
            NativeDragEvent::Drop { paths, position } => {
                let entries = paths.iter().map(|p| DropEntry::from_path(p)).collect();
                Some(self.finish(entries, position, DragSourceKind::Native))
            }
        }
    }

    fn enter(&mut self) {
        self.state.nesting = self.state.nesting.saturating_add(1);
        if self.state.nesting == 1 {
            self.state.phase = DragPhase::Entering;
        }
        self.publish();
    }

    fn over(&mut self) {
        if self.state.nesting == 0 {
            self.state.nesting = 1;
        }
        self.state.phase = DragPhase::Over;
        self.publish();
    }

    fn finish(
        &mut self,
        entries: Vec<DropEntry>,
        point: Option<Point>,
        source: DragSourceKind,
    ) -> DropBatch {
        self.state.phase = DragPhase::Dropped;
        self.publish();
        self.reset();

        log::info!("📥 收到拖放: {} 个条目 ({:?})", entries.len(), source);
        DropBatch {
            entries,
            point,
            source,
        }
    }

    fn reset(&mut self) {
        self.state = DragState::default();
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state);
    }
}
