//! # 捕获事件回放工具
//!
//! 读取 JSON Lines 格式的窗口事件脚本，驱动一个使用“空跑宿主”的捕获会话，
//! 最后输出缓冲区快照。用于在没有桌面壳的环境下复现拖放与提交流程。
//!
//! ```text
//! capture-replay script.jsonl [--dom]
//!
//! {"event":"show"}
//! {"event":"edit","text":"Meeting notes"}
//! {"event":"nativeDrag","drag":{"type":"drop","paths":["/tmp/a.png"]}}
//! {"event":"wait","ms":50}
//! {"event":"key","key":"Enter","metaKey":true}
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose;
use serde::Deserialize;

use note_capture::drag::{DomDragEvent, DomDragKind, NativeDragEvent, Point, Rect};
use note_capture::ingest::DropEntry;
use note_capture::insertion::TextViewport;
use note_capture::settings::{Settings, SettingsSnapshot, SettingsSyncChannel};
use note_capture::shortcut::KeyEvent;
use note_capture::{
    AppError, CaptureHost, CaptureSession, HostError, HostResult, SavedImage, SessionConfig,
    SessionHandle, WindowEvent,
};

/// 脚本中的一步。
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ScriptStep {
    Show,
    CaptureText {
        text: String,
    },
    Edit {
        text: String,
        #[serde(default)]
        caret: Option<usize>,
    },
    Caret {
        caret: Option<usize>,
    },
    Key(KeyEvent),
    #[serde(rename_all = "camelCase")]
    Layout {
        container: Rect,
        #[serde(default)]
        text_viewport: Option<TextViewport>,
    },
    NativeDrag {
        drag: NativeDragEvent,
    },
    DomDrop {
        files: Vec<ScriptFile>,
        #[serde(default)]
        point: Option<Point>,
    },
    RemoveImage {
        id: String,
    },
    Settings {
        snapshot: SettingsSnapshot,
    },
    Submit,
    SaveAsNote,
    Hide,
    OpenSettings,
    Wait {
        ms: u64,
    },
}

/// DOM 拖放中的文件：带路径，或带 base64 内容。
#[derive(Debug, Deserialize)]
struct ScriptFile {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    base64: Option<String>,
}

impl ScriptFile {
    fn into_entry(self) -> DropEntry {
        let entry = match self.base64 {
            Some(data) => match general_purpose::STANDARD.decode(data.as_bytes()) {
                Ok(bytes) => DropEntry::from_bytes(self.name.clone(), bytes),
                Err(e) => DropEntry::unreadable(self.name.clone(), e.to_string()),
            },
            None => DropEntry {
                filename: self.name.clone(),
                path: None,
                bytes: None,
            },
        };
        match self.path {
            Some(path) => entry.with_path(path),
            None => entry,
        }
    }
}

/// 不落盘的宿主：生成引用并把提交内容打印到标准输出。
struct DryRunHost {
    native_drag: bool,
    image_width: Mutex<String>,
    notes: Mutex<u32>,
}

impl DryRunHost {
    fn new(native_drag: bool) -> Self {
        Self {
            native_drag,
            image_width: Mutex::new(Settings::default().default_image_width),
            notes: Mutex::new(0),
        }
    }

    fn set_image_width(&self, width: &str) {
        if let Ok(mut current) = self.image_width.lock() {
            *current = width.to_string();
        }
    }

    fn saved(&self, filename: &str) -> HostResult<SavedImage> {
        let width = self
            .image_width
            .lock()
            .map_err(|_| HostError::from("图片宽度锁已中毒"))?
            .clone();
        Ok(SavedImage {
            markdown: SavedImage::embed_markdown(filename, Some(&width)),
            saved_path: format!("dry-run/assets/{}", filename),
            filename: filename.to_string(),
        })
    }
}

impl CaptureHost for DryRunHost {
    fn native_drag_available(&self) -> bool {
        self.native_drag
    }

    async fn save_image(&self, path: &str) -> HostResult<SavedImage> {
        let filename = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| HostError::from("路径缺少文件名"))?;
        self.saved(filename)
    }

    async fn save_image_from_bytes(
        &self,
        base64_data: String,
        filename: &str,
    ) -> HostResult<SavedImage> {
        log::info!("💾 [dry-run] 保存 {}（base64 {} 字符）", filename, base64_data.len());
        self.saved(filename)
    }

    async fn load_settings(&self) -> HostResult<SettingsSnapshot> {
        Ok(SettingsSnapshot::from_settings(&Settings::default()))
    }

    async fn append_to_daily_note(&self, text: &str) -> HostResult<()> {
        println!("[daily] {}", text);
        Ok(())
    }

    async fn save_as_note(&self, text: &str) -> HostResult<String> {
        let mut notes = self
            .notes
            .lock()
            .map_err(|_| HostError::from("笔记计数锁已中毒"))?;
        *notes += 1;
        let name = format!(
            "Capture {} #{}",
            chrono::Local::now().format("%Y-%m-%d %H%M%S"),
            notes
        );
        println!("[note:{}] {}", name, text);
        Ok(name)
    }

    async fn hide_capture(&self) -> HostResult<()> {
        log::info!("🙈 [dry-run] 隐藏捕获窗口");
        Ok(())
    }

    async fn open_settings(&self) -> HostResult<()> {
        log::info!("⚙️ [dry-run] 打开设置窗口");
        Ok(())
    }
}

async fn apply_step(
    step: ScriptStep,
    session: &SessionHandle,
    channel: &SettingsSyncChannel,
    host: &DryRunHost,
) -> Result<(), AppError> {
    let event = match step {
        ScriptStep::Show => WindowEvent::ShowCapture,
        ScriptStep::CaptureText { text } => WindowEvent::InsertCaptureText(text),
        ScriptStep::Edit { text, caret } => WindowEvent::EditText { text, caret },
        ScriptStep::Caret { caret } => WindowEvent::SetCaret(caret),
        ScriptStep::Key(key) => WindowEvent::Key(key),
        ScriptStep::Layout {
            container,
            text_viewport,
        } => WindowEvent::Layout {
            container,
            text_viewport,
        },
        ScriptStep::NativeDrag { drag } => WindowEvent::NativeDrag(drag),
        ScriptStep::DomDrop { files, point } => {
            let mut drop = DomDragEvent::new(DomDragKind::Drop)
                .with_files(files.into_iter().map(ScriptFile::into_entry).collect());
            drop.point = point;
            WindowEvent::DomDrag(drop)
        }
        ScriptStep::RemoveImage { id } => WindowEvent::RemoveImage(id),
        ScriptStep::Settings { snapshot } => {
            if let Some(width) = snapshot.default_image_width.as_deref() {
                host.set_image_width(width);
            }
            channel.publish(snapshot);
            return Ok(());
        }
        ScriptStep::Submit => WindowEvent::Submit,
        ScriptStep::SaveAsNote => WindowEvent::SaveAsNote,
        ScriptStep::Hide => WindowEvent::Hide,
        ScriptStep::OpenSettings => WindowEvent::OpenSettings,
        ScriptStep::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            return Ok(());
        }
    };
    session.send(event).await
}

async fn replay(script_path: &str, native_drag: bool) -> Result<(), AppError> {
    let script = std::fs::read_to_string(script_path)?;

    let host = Arc::new(DryRunHost::new(native_drag));
    let channel = SettingsSyncChannel::default();
    let session = CaptureSession::start(Arc::clone(&host), &channel, SessionConfig::default()).await;

    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: ScriptStep = serde_json::from_str(line).inspect_err(|e| {
            log::error!("❌ 第 {} 行无法解析: {}", index + 1, e);
        })?;
        log::debug!("▶️ 第 {} 行: {:?}", index + 1, step);
        apply_step(step, &session, &channel, &host).await?;
    }

    // 留出时间让进行中的导入与提交回流
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = session.buffer().borrow().clone();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    if let Some(status) = session.status().borrow().clone() {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    let stats = session.previews().stats();
    log::info!(
        "📊 预览统计: 分配 {} / 释放 {} / 未释放 {}",
        stats.allocated,
        stats.released,
        stats.outstanding
    );

    session.shutdown().await
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(script_path) = args.next() else {
        eprintln!("用法: capture-replay <script.jsonl> [--dom]");
        std::process::exit(2);
    };
    let native_drag = !args.any(|arg| arg == "--dom");

    if let Err(err) = replay(&script_path, native_drag).await {
        log::error!("❌ 回放失败: {}", err);
        std::process::exit(1);
    }
}
