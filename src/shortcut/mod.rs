//! # 快捷键匹配模块（shortcut）
//!
//! ## 设计思路
//!
//! 设置里的快捷键是形如 `Cmd+Shift+Enter` 的字符串。窗口内快捷键（提交到日记、
//! 另存为笔记、隐藏）需要在每次按键时判断是否命中，因此先解析为不可变的
//! `ShortcutSpec`，按键时只做布尔比较。
//!
//! ## 实现思路
//!
//! - 修饰键必须“精确相等”，不能是子集或超集。
//! - 唯一例外：配置了 `Cmd` 时，物理 meta 或 ctrl 任一按下均可满足，
//!   方便在 Windows/Linux 键盘上用 Ctrl 代替 Cmd。
//! - 键名大小写不敏感，并吸收 `Return`/`Esc` 等常见别名。
//! - 全局快捷键（由宿主注册）的规范化与校验放在 `global` 子模块。

mod global;

use serde::Deserialize;

use crate::settings::Settings;

pub use global::{normalize_for_global, validate_global};

/// 快捷键错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("快捷键为空")]
    Empty,

    #[error("无效快捷键 '{0}'：{1}")]
    InvalidShortcut(String, String),
}

/// 修饰键集合。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub cmd: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

/// 已解析的快捷键，解析后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutSpec {
    modifiers: Modifiers,
    key: String,
}

/// 前端转发过来的按键事件（字段与 DOM `KeyboardEvent` 对齐）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub alt_key: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift_key = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt_key = true;
        self
    }
}

enum Token {
    Cmd,
    Ctrl,
    Shift,
    Alt,
    Key(String),
}

fn classify_token(token: &str) -> Token {
    match token.to_ascii_lowercase().as_str() {
        "cmd" | "command" | "meta" | "super" | "commandorcontrol" | "cmdorctrl" => {
            Token::Cmd
        }
        "ctrl" | "control" => Token::Ctrl,
        "shift" => Token::Shift,
        "alt" | "option" | "opt" => Token::Alt,
        _ => Token::Key(canonical_key(token)),
    }
}

/// 键名规范化：小写 + 别名归一。
fn canonical_key(key: &str) -> String {
    if key == " " {
        return "space".to_string();
    }
    let lower = key.trim().to_lowercase();
    match lower.as_str() {
        "return" => "enter".to_string(),
        "esc" => "escape".to_string(),
        "spacebar" => "space".to_string(),
        "arrowup" => "up".to_string(),
        "arrowdown" => "down".to_string(),
        "arrowleft" => "left".to_string(),
        "arrowright" => "right".to_string(),
        "del" => "delete".to_string(),
        _ => lower,
    }
}

impl ShortcutSpec {
    /// 解析快捷键字符串。
    ///
    /// 去掉所有修饰键后必须恰好剩下一个按键，否则返回 `InvalidShortcut`。
    ///
    /// # 示例
    /// ```rust
    /// use note_capture::shortcut::{KeyEvent, ShortcutSpec};
    ///
    /// let spec = ShortcutSpec::parse("Cmd+Enter")?;
    /// assert!(spec.matches(&KeyEvent::new("Enter").with_meta()));
    /// # Ok::<(), note_capture::shortcut::ShortcutError>(())
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ShortcutError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ShortcutError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key: Option<String> = None;

        for part in trimmed.split('+') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match classify_token(part) {
                Token::Cmd => modifiers.cmd = true,
                Token::Ctrl => modifiers.ctrl = true,
                Token::Shift => modifiers.shift = true,
                Token::Alt => modifiers.alt = true,
                Token::Key(k) => {
                    if let Some(existing) = &key {
                        return Err(ShortcutError::InvalidShortcut(
                            raw.to_string(),
                            format!("包含多个按键（{} 与 {}）", existing, k),
                        ));
                    }
                    key = Some(k);
                }
            }
        }

        let key = key.ok_or_else(|| {
            ShortcutError::InvalidShortcut(raw.to_string(), "缺少非修饰键".to_string())
        })?;

        Ok(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 判断按键事件是否命中该快捷键。
    pub fn matches(&self, event: &KeyEvent) -> bool {
        let m = self.modifiers;

        if event.shift_key != m.shift || event.alt_key != m.alt {
            return false;
        }

        let modifiers_ok = match (m.cmd, m.ctrl) {
            // 仅 Cmd：meta 与 ctrl 恰好按下其一
            (true, false) => event.meta_key != event.ctrl_key,
            (true, true) => event.ctrl_key,
            (false, true) => event.ctrl_key && !event.meta_key,
            (false, false) => !event.ctrl_key && !event.meta_key,
        };

        modifiers_ok && canonical_key(&event.key) == self.key
    }
}

/// 窗口内快捷键对应的动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// 追加到今日日记
    AppendToDaily,
    /// 另存为独立笔记
    SaveAsNote,
    /// 隐藏捕获窗口
    Hide,
}

const HIDE_SHORTCUT: &str = "Escape";

/// 当前生效的窗口快捷键表。
///
/// 配置非法的绑定会被视为“未设置”，不会影响其它绑定。
#[derive(Debug, Clone, Default)]
pub struct ShortcutBindings {
    bindings: Vec<(ShortcutAction, ShortcutSpec)>,
}

impl ShortcutBindings {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut bindings = Vec::with_capacity(3);

        // 修饰键更多的绑定优先匹配
        for (action, raw) in [
            (ShortcutAction::SaveAsNote, settings.save_as_note_shortcut.as_str()),
            (ShortcutAction::AppendToDaily, settings.save_to_daily_shortcut.as_str()),
            (ShortcutAction::Hide, HIDE_SHORTCUT),
        ] {
            match ShortcutSpec::parse(raw) {
                Ok(spec) => bindings.push((action, spec)),
                Err(ShortcutError::Empty) => {
                    log::info!("⌨️ 快捷键 {:?} 未设置，跳过绑定", action);
                }
                Err(err) => {
                    log::warn!("⚠️ 快捷键 {:?} 配置无效，视为未设置：{}", action, err);
                }
            }
        }

        Self { bindings }
    }

    pub fn dispatch(&self, event: &KeyEvent) -> Option<ShortcutAction> {
        self.bindings
            .iter()
            .find(|(_, spec)| spec.matches(event))
            .map(|(action, _)| *action)
    }

    pub fn is_bound(&self, action: ShortcutAction) -> bool {
        self.bindings.iter().any(|(a, _)| *a == action)
    }
}
