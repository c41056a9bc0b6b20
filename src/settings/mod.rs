//! # 设置模型模块（settings）
//!
//! ## 设计思路
//!
//! 设置文件的持久化由宿主负责，本模块只关心两件事：
//! - `Settings`：捕获窗口持有的完整“工作副本”，带生产可用的默认值；
//! - `SettingsSnapshot`：宿主广播的“部分快照”，缺省字段表示“保持原值”。
//!
//! 消费方只合并快照中出现的字段，旧版本宿主少发字段、新版本多发字段都不会
//! 把本地值覆盖成默认值（向前兼容的部分更新）。
//!
//! ## 实现思路
//!
//! - 快照字段全部为 `Option`，序列化时跳过 `None`。
//! - `Settings::merge` 返回本次实际变化的字段名，便于日志与按需重建快捷键表。
//! - `Settings::validate` 沿用设置编辑器的取值范围，颜色字段使用预编译正则。
//! - 广播通道见 `sync` 子模块。

mod sync;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::shortcut;

pub use sync::{SettingsConsumer, SettingsSyncChannel};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("颜色正则必须合法")
});

/// 设置校验错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("设置项 {field} 非法：{reason}")]
    Invalid { field: &'static str, reason: String },
}

impl SettingsError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 捕获窗口使用的完整设置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window_width: u32,
    pub window_height: u32,
    pub border_radius: u32,
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
    pub font_size: u32,
    pub window_transparency: u32,
    pub window_blur: u32,
    pub window_saturation: u32,
    pub window_brightness: i32,
    pub global_shortcut: String,
    pub capture_text_shortcut: String,
    pub save_to_daily_shortcut: String,
    pub save_as_note_shortcut: String,
    /// 插入图片引用时附带的显示宽度，空字符串表示不指定
    pub default_image_width: String,
    pub compression_max_kb: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 330,
            window_height: 600,
            border_radius: 12,
            background_color: "#1e1e2e".to_string(),
            text_color: "#ffffff".to_string(),
            font_family: "-apple-system, BlinkMacSystemFont, SF Pro Display".to_string(),
            font_size: 15,
            window_transparency: 55,
            window_blur: 80,
            window_saturation: 200,
            window_brightness: 0,
            global_shortcut: "Cmd+Shift+N".to_string(),
            capture_text_shortcut: "Cmd+Shift+C".to_string(),
            save_to_daily_shortcut: "Cmd+Enter".to_string(),
            save_as_note_shortcut: "Cmd+Shift+Enter".to_string(),
            default_image_width: "600".to_string(),
            compression_max_kb: 200,
        }
    }
}

/// 宿主广播的部分设置快照，一经广播即不可变。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_transparency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_blur: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_saturation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_brightness: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_shortcut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_text_shortcut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_to_daily_shortcut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_as_note_shortcut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_image_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_max_kb: Option<u32>,
}

macro_rules! merge_fields {
    ($target:expr, $snapshot:expr, $changed:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = &$snapshot.$field {
                if $target.$field != *value {
                    $target.$field = value.clone();
                    $changed.push(stringify!($field));
                }
            }
        )*
    };
}

macro_rules! snapshot_fields {
    ($settings:expr, [$($field:ident),* $(,)?]) => {
        SettingsSnapshot {
            $($field: Some($settings.$field.clone()),)*
        }
    };
}

impl SettingsSnapshot {
    /// 将完整设置包装为“所有字段都存在”的快照。
    pub fn from_settings(settings: &Settings) -> Self {
        snapshot_fields!(settings, [
            window_width,
            window_height,
            border_radius,
            background_color,
            text_color,
            font_family,
            font_size,
            window_transparency,
            window_blur,
            window_saturation,
            window_brightness,
            global_shortcut,
            capture_text_shortcut,
            save_to_daily_shortcut,
            save_as_note_shortcut,
            default_image_width,
            compression_max_kb,
        ])
    }

    pub fn touches_shortcuts(&self) -> bool {
        self.save_to_daily_shortcut.is_some() || self.save_as_note_shortcut.is_some()
    }
}

impl Settings {
    /// 合并部分快照，返回实际发生变化的字段名。
    pub fn merge(&mut self, snapshot: &SettingsSnapshot) -> Vec<&'static str> {
        let mut changed = Vec::new();
        merge_fields!(self, snapshot, changed, [
            window_width,
            window_height,
            border_radius,
            background_color,
            text_color,
            font_family,
            font_size,
            window_transparency,
            window_blur,
            window_saturation,
            window_brightness,
            global_shortcut,
            capture_text_shortcut,
            save_to_daily_shortcut,
            save_as_note_shortcut,
            default_image_width,
            compression_max_kb,
        ]);
        changed
    }

    /// 图片引用里的显示宽度（已去空白，空则为 `None`）。
    pub fn image_width_hint(&self) -> Option<&str> {
        let width = self.default_image_width.trim();
        (!width.is_empty()).then_some(width)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(200..=800).contains(&self.window_width) {
            return Err(SettingsError::invalid("window_width", "必须在 200~800 之间"));
        }
        if !(80..=1200).contains(&self.window_height) {
            return Err(SettingsError::invalid("window_height", "必须在 80~1200 之间"));
        }
        if self.border_radius > 30 {
            return Err(SettingsError::invalid("border_radius", "必须在 0~30 之间"));
        }
        if !(10..=24).contains(&self.font_size) {
            return Err(SettingsError::invalid("font_size", "必须在 10~24 之间"));
        }
        if !(50..=2000).contains(&self.compression_max_kb) {
            return Err(SettingsError::invalid("compression_max_kb", "必须在 50~2000 之间"));
        }
        if self.window_transparency > 100 {
            return Err(SettingsError::invalid("window_transparency", "必须在 0~100 之间"));
        }
        if self.window_blur > 200 {
            return Err(SettingsError::invalid("window_blur", "必须在 0~200 之间"));
        }
        if self.window_saturation > 300 {
            return Err(SettingsError::invalid("window_saturation", "必须在 0~300 之间"));
        }
        if !(-100..=100).contains(&self.window_brightness) {
            return Err(SettingsError::invalid("window_brightness", "必须在 -100~100 之间"));
        }

        for (field, value) in [
            ("background_color", &self.background_color),
            ("text_color", &self.text_color),
        ] {
            if !HEX_COLOR.is_match(value.trim()) {
                return Err(SettingsError::invalid(field, format!("不是合法的十六进制颜色：{}", value)));
            }
        }

        if let Some(width) = self.image_width_hint() {
            match width.parse::<u32>() {
                Ok(w) if w > 0 => {}
                _ => {
                    return Err(SettingsError::invalid(
                        "default_image_width",
                        "必须为空或正整数",
                    ));
                }
            }
        }

        for (field, value) in [
            ("global_shortcut", &self.global_shortcut),
            ("capture_text_shortcut", &self.capture_text_shortcut),
            ("save_as_note_shortcut", &self.save_as_note_shortcut),
        ] {
            if !value.trim().is_empty() {
                shortcut::validate_global(value).map_err(|reason| SettingsError::invalid(field, reason))?;
            }
        }

        if !self.save_to_daily_shortcut.trim().is_empty() {
            shortcut::ShortcutSpec::parse(&self.save_to_daily_shortcut)
                .map_err(|e| SettingsError::invalid("save_to_daily_shortcut", e.to_string()))?;
        }

        Ok(())
    }
}
