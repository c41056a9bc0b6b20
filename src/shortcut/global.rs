//! 全局快捷键字符串的规范化与校验
//!
//! 全局快捷键由宿主在系统层注册，格式要求比窗口内快捷键严格：
//! 至少一个修饰键，且按键必须在支持列表内。

const VALID_MODIFIERS: [&str; 4] = ["CommandOrControl", "Shift", "Alt", "Super"];

const VALID_KEYS: [&str; 60] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "F1",
    "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "Space", "Tab", "Enter",
    "Escape", "Backspace", "Delete", "Up", "Down", "Left", "Right", "Home", "End",
];

const VALID_PAGE_KEYS: [&str; 2] = ["PageUp", "PageDown"];

/// 将 `Cmd`/`Ctrl` 统一改写为 `CommandOrControl`，`Option` 改写为 `Alt`。
pub fn normalize_for_global(shortcut: &str) -> String {
    if shortcut.contains("CommandOrControl") {
        return shortcut.to_string();
    }

    shortcut
        .split('+')
        .map(|part| match part.trim() {
            "Cmd" | "Command" | "Ctrl" | "Control" => "CommandOrControl".to_string(),
            "Option" | "Opt" => "Alt".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// 校验全局快捷键：至少一个修饰键 + 一个受支持的按键。
pub fn validate_global(shortcut: &str) -> Result<(), String> {
    let normalized = normalize_for_global(shortcut);
    let parts: Vec<&str> = normalized.split('+').map(str::trim).collect();

    if parts.len() < 2 {
        return Err("快捷键至少需要一个修饰键和一个按键".to_string());
    }

    let mut has_modifier = false;
    let mut has_key = false;

    for part in &parts {
        if VALID_MODIFIERS.contains(part) {
            has_modifier = true;
        } else if VALID_KEYS
            .iter()
            .chain(VALID_PAGE_KEYS.iter())
            .any(|k| k.eq_ignore_ascii_case(part))
        {
            has_key = true;
        }
    }

    if !has_modifier {
        return Err("快捷键至少需要一个修饰键（Cmd、Shift、Alt）".to_string());
    }
    if !has_key {
        return Err("快捷键缺少有效按键".to_string());
    }

    Ok(())
}
