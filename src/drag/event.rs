//! 拖放事件模型
//!
//! 两路事件源的数据形状差异很大：
//! - DOM 事件：`enter/over/leave/drop`，携带坐标、文件列表，且同一手势会在
//!   捕获阶段与冒泡阶段各出现一次；
//! - 宿主原生事件：显式阶段标签，`drop` 时直接给出已解析的文件系统路径。
//!
//! 这里只做数据建模，状态机见 `tracker`。

use serde::Deserialize;

use crate::ingest::DropEntry;

/// 视口坐标系中的点（CSS 像素）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 视口坐标系中的矩形。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// 边界上的点视为在内部。
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }
}

/// DOM 拖放事件类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomDragKind {
    Enter,
    Over,
    Leave,
    Drop,
}

/// DOM 监听阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerPhase {
    #[default]
    Capture,
    Bubble,
}

/// 外层容器上观察到的一次 DOM 拖放事件。
#[derive(Debug, Clone)]
pub struct DomDragEvent {
    pub kind: DomDragKind,
    pub phase: ListenerPhase,
    pub point: Option<Point>,
    /// 事件目标是否为文档根（拖出窗口时浏览器常以根节点上报）
    pub at_document_root: bool,
    pub files: Vec<DropEntry>,
}

impl DomDragEvent {
    pub fn new(kind: DomDragKind) -> Self {
        Self {
            kind,
            phase: ListenerPhase::Capture,
            point: None,
            at_document_root: false,
            files: Vec::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.point = Some(Point::new(x, y));
        self
    }

    pub fn bubbling(mut self) -> Self {
        self.phase = ListenerPhase::Bubble;
        self
    }

    pub fn from_document_root(mut self) -> Self {
        self.at_document_root = true;
        self
    }

    pub fn with_files(mut self, files: Vec<DropEntry>) -> Self {
        self.files = files;
        self
    }
}

/// 宿主原生拖放事件。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NativeDragEvent {
    Enter {
        #[serde(default)]
        paths: Vec<String>,
        #[serde(default)]
        position: Option<Point>,
    },
    Over {
        #[serde(default)]
        position: Option<Point>,
    },
    Leave,
    Drop {
        paths: Vec<String>,
        #[serde(default)]
        position: Option<Point>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(110.0, 60.0)));
        assert!(!rect.contains(Point::new(9.9, 30.0)));
        assert!(!rect.contains(Point::new(50.0, 60.1)));
    }

    #[test]
    fn test_native_event_deserialize() {
        let event: NativeDragEvent =
            serde_json::from_str(r#"{"type":"drop","paths":["/tmp/a.png"],"position":{"x":1.0,"y":2.0}}"#)
                .expect("drop event should parse");

        assert_eq!(
            event,
            NativeDragEvent::Drop {
                paths: vec!["/tmp/a.png".to_string()],
                position: Some(Point::new(1.0, 2.0)),
            }
        );

        let leave: NativeDragEvent =
            serde_json::from_str(r#"{"type":"leave"}"#).expect("leave event should parse");
        assert_eq!(leave, NativeDragEvent::Leave);
    }
}
