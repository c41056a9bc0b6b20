//! 插入位置计算
//!
//! 图片引用插入到哪里，按以下优先级决定：
//! 1. 已知光标位置（夹紧到正文长度）；
//! 2. 拖放点落在文本区域内：按行高换算出行号，插到该行行首；
//! 3. 其他情况：正文末尾。
//!
//! 所有偏移量都以字符（Unicode 标量值）计。

use serde::Deserialize;

use crate::drag::{Point, Rect};

/// 文本区域的几何信息。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextViewport {
    pub bounds: Rect,
    pub line_height: f64,
    #[serde(default)]
    pub scroll_top: f64,
}

/// 计算插入位置所需的上下文。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InsertionContext {
    pub caret: Option<usize>,
    pub drop_point: Option<Point>,
    pub viewport: Option<TextViewport>,
}

/// 计算插入偏移量（字符数）。
pub fn resolve(text: &str, ctx: &InsertionContext) -> usize {
    let len = text.chars().count();

    if let Some(caret) = ctx.caret {
        return caret.min(len);
    }

    let (Some(point), Some(viewport)) = (ctx.drop_point, ctx.viewport) else {
        return len;
    };
    if viewport.line_height <= 0.0 || !viewport.bounds.contains(point) {
        return len;
    }

    let relative = point.y - viewport.bounds.top + viewport.scroll_top.max(0.0);
    let line = (relative / viewport.line_height).floor().max(0.0) as usize;

    let offset: usize = text
        .split('\n')
        .take(line)
        .map(|l| l.chars().count() + 1)
        .sum();
    offset.min(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> TextViewport {
        TextViewport {
            bounds: Rect::new(0.0, 100.0, 300.0, 200.0),
            line_height: 20.0,
            scroll_top: 0.0,
        }
    }

    fn drop_at(y: f64) -> InsertionContext {
        InsertionContext {
            caret: None,
            drop_point: Some(Point::new(50.0, y)),
            viewport: Some(viewport()),
        }
    }

    #[test]
    fn test_caret_wins_and_is_clamped() {
        let ctx = InsertionContext {
            caret: Some(99),
            ..drop_at(110.0)
        };
        assert_eq!(resolve("hello", &ctx), 5);

        let ctx = InsertionContext {
            caret: Some(2),
            ..InsertionContext::default()
        };
        assert_eq!(resolve("hello", &ctx), 2);
    }

    #[test]
    fn test_drop_point_maps_to_line_start() {
        let text = "first\nsecond\nthird";
        assert_eq!(resolve(text, &drop_at(105.0)), 0);
        assert_eq!(resolve(text, &drop_at(125.0)), 6);
        assert_eq!(resolve(text, &drop_at(145.0)), 13);
        // 超出最后一行
        assert_eq!(resolve(text, &drop_at(290.0)), text.chars().count());
    }

    #[test]
    fn test_scroll_offset_is_applied() {
        let text = "a\nb\nc\nd";
        let mut ctx = drop_at(105.0);
        if let Some(vp) = ctx.viewport.as_mut() {
            vp.scroll_top = 40.0;
        }
        assert_eq!(resolve(text, &ctx), 4);
    }

    #[test]
    fn test_offsets_count_chars_not_bytes() {
        let text = "你好\n世界";
        assert_eq!(resolve(text, &drop_at(125.0)), 3);
    }

    #[test]
    fn test_fallback_to_end() {
        let text = "abc";
        assert_eq!(resolve(text, &InsertionContext::default()), 3);
        assert_eq!(resolve(text, &drop_at(20.0)), 3);

        let mut ctx = drop_at(110.0);
        if let Some(vp) = ctx.viewport.as_mut() {
            vp.line_height = 0.0;
        }
        assert_eq!(resolve(text, &ctx), 3);
    }
}
