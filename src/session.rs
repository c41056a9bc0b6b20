//! 捕获会话
//!
//! 一个捕获窗口对应一个会话任务。会话是缓冲区、拖放状态、快捷键表与导入流水线的
//! 唯一持有者，窗口事件与异步结果都经由同一个队列串行处理。
//!
//! # 设计思路
//!
//! - 窗口事件（按键、编辑、拖放、显示/隐藏）进入 `mpsc` 队列，按到达顺序处理；
//! - 导入与提交是唯一需要等待宿主的地方，放到独立任务中执行，完成后把结果
//!   投递回同一个队列；
//! - 投递回来的导入结果带有发起时的缓冲区 `generation`，期间缓冲区被重置过的
//!   结果直接丢弃，并释放其中的临时预览；
//! - 设置广播与窗口事件在同一个 `select!` 中等待，快捷键变化立即生效。
//!
//! # 实现思路
//!
//! 会话内部只持有队列的弱引用，用户侧句柄全部释放后队列自然关闭、会话退出。
//! 状态提示通过 `watch` 发布，到期后由计时任务投递撤销消息。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::buffer::{BufferSnapshot, CaptureBufferManager};
use crate::drag::{
    DomDragEvent, DragDropTracker, DragSourceKind, DragState, DropBatch, NativeDragEvent, Rect,
};
use crate::error::AppError;
use crate::host::{CaptureHost, HostResult};
use crate::ingest::{ImageIngestionPipeline, IngestConfig, IngestReport, PreviewRegistry};
use crate::insertion::{self, InsertionContext, TextViewport};
use crate::log_safety;
use crate::settings::{Settings, SettingsConsumer, SettingsSyncChannel};
use crate::shortcut::{KeyEvent, ShortcutAction, ShortcutBindings};

/// 会话配置。
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 状态提示自动消失的时间
    pub status_ttl: Duration,
    pub queue_capacity: usize,
    pub ingest: IngestConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_ttl: Duration::from_secs(3),
            queue_capacity: 64,
            ingest: IngestConfig::default(),
        }
    }
}

/// 捕获窗口发来的事件。
#[derive(Debug)]
pub enum WindowEvent {
    /// 宿主唤起捕获窗口：清空缓冲区并绑定拖放事件源
    ShowCapture,
    /// 宿主带来的选中文本
    InsertCaptureText(String),
    SaveAsNote,
    /// 追加到今日日记
    Submit,
    Hide,
    OpenSettings,
    Key(KeyEvent),
    EditText {
        text: String,
        caret: Option<usize>,
    },
    SetCaret(Option<usize>),
    RemoveImage(String),
    /// 容器与文本区域的布局变化
    Layout {
        container: Rect,
        text_viewport: Option<TextViewport>,
    },
    DomDrag(DomDragEvent),
    NativeDrag(NativeDragEvent),
}

/// 提交方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmitAction {
    AppendToDaily,
    SaveAsNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// 状态提示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub id: u64,
    pub level: StatusLevel,
    pub text: String,
}

enum Message {
    Window(WindowEvent),
    IngestFinished {
        generation: u64,
        at: usize,
        report: IngestReport,
    },
    SubmitFinished {
        generation: u64,
        action: SubmitAction,
        result: HostResult<Option<String>>,
    },
    DismissStatus(u64),
    Shutdown,
}

/// 会话句柄：投递事件并观察会话状态。
pub struct SessionHandle {
    sender: mpsc::Sender<Message>,
    buffer: watch::Receiver<BufferSnapshot>,
    drag: watch::Receiver<DragState>,
    status: watch::Receiver<Option<StatusMessage>>,
    previews: PreviewRegistry,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// 投递窗口事件；会话已结束时返回错误。
    pub async fn send(&self, event: WindowEvent) -> Result<(), AppError> {
        self.sender
            .send(Message::Window(event))
            .await
            .map_err(|_| AppError::Session("会话已结束".to_string()))
    }

    pub fn buffer(&self) -> watch::Receiver<BufferSnapshot> {
        self.buffer.clone()
    }

    pub fn drag_state(&self) -> watch::Receiver<DragState> {
        self.drag.clone()
    }

    pub fn status(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.status.clone()
    }

    /// 会话使用的预览注册表，宿主的资源协议从这里读取临时预览。
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// 结束会话并等待其退出。
    pub async fn shutdown(self) -> Result<(), AppError> {
        // 会话可能已经自行退出，投递失败不影响等待
        let _ = self.sender.send(Message::Shutdown).await;
        self.task
            .await
            .map_err(|e| AppError::Session(format!("会话任务异常退出：{}", e)))
    }
}

/// 捕获会话。
pub struct CaptureSession<H: CaptureHost> {
    host: Arc<H>,
    buffer: CaptureBufferManager,
    tracker: DragDropTracker,
    pipeline: ImageIngestionPipeline<H>,
    bindings: ShortcutBindings,
    settings: SettingsConsumer,
    container: Option<Rect>,
    viewport: Option<TextViewport>,
    status: watch::Sender<Option<StatusMessage>>,
    status_seq: u64,
    submitting: bool,
    sender: mpsc::WeakSender<Message>,
    config: SessionConfig,
}

impl<H: CaptureHost> CaptureSession<H> {
    /// 读取初始设置并启动会话任务。
    ///
    /// 读取设置失败时使用默认设置继续运行。
    pub async fn start(
        host: Arc<H>,
        channel: &SettingsSyncChannel,
        config: SessionConfig,
    ) -> SessionHandle {
        // 先订阅再读取，读取期间的广播不会丢失
        let mut settings = channel.subscribe(Settings::default());
        match host.load_settings().await {
            Ok(snapshot) => {
                settings.apply(&snapshot);
            }
            Err(e) => log::warn!("⚠️ 读取设置失败，使用默认设置: {}", e),
        }
        if let Err(e) = settings.settings().validate() {
            log::warn!("⚠️ 当前设置未通过校验: {}", e);
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let previews = PreviewRegistry::new();
        let buffer = CaptureBufferManager::new(previews.clone());
        let tracker = DragDropTracker::new();
        let (status, status_rx) = watch::channel(None);

        let handle_buffer = buffer.subscribe();
        let handle_drag = tracker.subscribe();

        let session = Self {
            pipeline: ImageIngestionPipeline::new(
                Arc::clone(&host),
                previews.clone(),
                config.ingest.clone(),
            ),
            host,
            buffer,
            tracker,
            bindings: ShortcutBindings::from_settings(settings.settings()),
            settings,
            container: None,
            viewport: None,
            status,
            status_seq: 0,
            submitting: false,
            sender: sender.downgrade(),
            config,
        };

        let task = tokio::spawn(session.run(receiver));

        SessionHandle {
            sender,
            buffer: handle_buffer,
            drag: handle_drag,
            status: status_rx,
            previews,
            task,
        }
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<Message>) {
        log::info!("🚀 捕获会话已启动");
        let mut settings_open = true;

        loop {
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(Message::Shutdown) | None => break,
                    Some(message) => self.handle(message),
                },
                update = self.settings.next_update(), if settings_open => match update {
                    Some((_, changed)) => self.on_settings_changed(&changed),
                    None => {
                        log::debug!("设置广播已关闭");
                        settings_open = false;
                    }
                },
            }
        }

        // 队列中尚未处理的导入结果也要释放预览
        receiver.close();
        while let Ok(message) = receiver.try_recv() {
            if let Message::IngestFinished { report, .. } = message {
                discard_report(report, self.pipeline.previews());
            }
        }
        self.tracker.detach();
        log::info!("捕获会话已结束");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Window(event) => self.on_window_event(event),
            Message::IngestFinished {
                generation,
                at,
                report,
            } => self.on_ingest_finished(generation, at, report),
            Message::SubmitFinished {
                generation,
                action,
                result,
            } => self.on_submit_finished(generation, action, result),
            Message::DismissStatus(id) => {
                self.status.send_if_modified(|current| match current {
                    Some(status) if status.id == id => {
                        *current = None;
                        true
                    }
                    _ => false,
                });
            }
            Message::Shutdown => {}
        }
    }

    fn on_window_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::ShowCapture => self.show(),
            WindowEvent::InsertCaptureText(text) => {
                log::info!(
                    "📋 插入捕获文本（{} 字符）",
                    log_safety::summarize_text_len(&text)
                );
                self.buffer.insert_text(&text);
            }
            WindowEvent::SaveAsNote => self.submit(SubmitAction::SaveAsNote),
            WindowEvent::Submit => self.submit(SubmitAction::AppendToDaily),
            WindowEvent::Hide => self.hide(),
            WindowEvent::OpenSettings => {
                let host = Arc::clone(&self.host);
                tokio::spawn(async move {
                    if let Err(e) = host.open_settings().await {
                        log::warn!("⚠️ 打开设置窗口失败: {}", e);
                    }
                });
            }
            WindowEvent::Key(key) => match self.bindings.dispatch(&key) {
                Some(ShortcutAction::AppendToDaily) => self.submit(SubmitAction::AppendToDaily),
                Some(ShortcutAction::SaveAsNote) => self.submit(SubmitAction::SaveAsNote),
                Some(ShortcutAction::Hide) => self.hide(),
                None => {}
            },
            WindowEvent::EditText { text, caret } => self.buffer.set_text(text, caret),
            WindowEvent::SetCaret(caret) => self.buffer.set_caret(caret),
            WindowEvent::RemoveImage(id) => {
                if !self.buffer.remove_image(&id) {
                    log::debug!("移除的图片不存在: {}", id);
                }
            }
            WindowEvent::Layout {
                container,
                text_viewport,
            } => {
                self.container = Some(container);
                self.tracker.set_bounds(container);
                self.viewport = text_viewport;
            }
            WindowEvent::DomDrag(event) => {
                if let Some(batch) = self.tracker.handle_dom(event) {
                    self.start_ingest(batch);
                }
            }
            WindowEvent::NativeDrag(event) => {
                if let Some(batch) = self.tracker.handle_native(event) {
                    self.start_ingest(batch);
                }
            }
        }
    }

    fn show(&mut self) {
        self.buffer.reset();
        let source = if self.host.native_drag_available() {
            DragSourceKind::Native
        } else {
            DragSourceKind::Dom
        };
        self.tracker.attach(source, self.container);
        self.status.send_replace(None);
        log::info!("🪟 捕获窗口已显示（拖放事件源: {:?}）", source);
    }

    fn hide(&mut self) {
        self.tracker.detach();
        self.spawn_hide();
    }

    fn spawn_hide(&self) {
        let host = Arc::clone(&self.host);
        tokio::spawn(async move {
            if let Err(e) = host.hide_capture().await {
                log::warn!("⚠️ 隐藏捕获窗口失败: {}", e);
            }
        });
    }

    fn start_ingest(&mut self, batch: DropBatch) {
        if batch.entries.is_empty() {
            return;
        }

        let at = insertion::resolve(
            self.buffer.text(),
            &InsertionContext {
                caret: self.buffer.caret(),
                drop_point: batch.point,
                viewport: self.viewport,
            },
        );
        let generation = self.buffer.generation();
        let pipeline = self.pipeline.clone();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let report = pipeline.ingest(batch.entries).await;
            let message = Message::IngestFinished {
                generation,
                at,
                report,
            };

            let undelivered = match sender.upgrade() {
                Some(sender) => sender.send(message).await.err().map(|e| e.0),
                None => Some(message),
            };
            if let Some(Message::IngestFinished { report, .. }) = undelivered {
                log::debug!("会话已结束，丢弃导入结果");
                discard_report(report, pipeline.previews());
            }
        });
    }

    fn on_ingest_finished(&mut self, generation: u64, at: usize, report: IngestReport) {
        if generation != self.buffer.generation() {
            log::info!(
                "⏭️ 丢弃过期导入结果（发起于 generation={}，当前 {}）",
                generation,
                self.buffer.generation()
            );
            discard_report(report, self.pipeline.previews());
            return;
        }

        let summary = report.summary(self.pipeline.config());
        let level = if report.failed > 0 {
            StatusLevel::Error
        } else {
            StatusLevel::Warning
        };

        self.buffer.insert_images(report.records, at);
        if let Some(text) = summary {
            self.show_status(level, text);
        }
    }

    fn submit(&mut self, action: SubmitAction) {
        if self.submitting {
            log::debug!("提交进行中，忽略重复提交");
            return;
        }
        let Some(text) = self.buffer.submission_text() else {
            self.show_status(StatusLevel::Warning, "内容为空，未提交".to_string());
            return;
        };

        self.submitting = true;
        log::info!(
            "📝 提交 {:?}（{} 字符）",
            action,
            log_safety::summarize_text_len(&text)
        );

        let host = Arc::clone(&self.host);
        let sender = self.sender.clone();
        let generation = self.buffer.generation();

        tokio::spawn(async move {
            let result = match action {
                SubmitAction::AppendToDaily => host.append_to_daily_note(&text).await.map(|_| None),
                SubmitAction::SaveAsNote => host.save_as_note(&text).await.map(Some),
            };
            if let Some(sender) = sender.upgrade() {
                let _ = sender
                    .send(Message::SubmitFinished {
                        generation,
                        action,
                        result,
                    })
                    .await;
            }
        });
    }

    fn on_submit_finished(
        &mut self,
        generation: u64,
        action: SubmitAction,
        result: HostResult<Option<String>>,
    ) {
        self.submitting = false;

        match result {
            Ok(note) => {
                let text = match (action, note) {
                    (SubmitAction::SaveAsNote, Some(note)) => format!("已保存为笔记：{}", note),
                    (SubmitAction::SaveAsNote, None) => "已保存为笔记".to_string(),
                    (SubmitAction::AppendToDaily, _) => "已追加到今日日记".to_string(),
                };
                log::info!("✅ {}", text);

                // 提交期间窗口被重新唤起时，新内容保持不动
                if generation == self.buffer.generation() {
                    self.buffer.reset();
                    self.hide();
                }
                self.show_status(StatusLevel::Info, text);
            }
            Err(e) => {
                log::error!("❌ 提交失败 {:?}: {}", action, e);
                self.show_status(StatusLevel::Error, format!("保存失败：{}", e));
            }
        }
    }

    fn on_settings_changed(&mut self, changed: &[&'static str]) {
        if changed
            .iter()
            .any(|f| matches!(*f, "save_to_daily_shortcut" | "save_as_note_shortcut"))
        {
            self.bindings = ShortcutBindings::from_settings(self.settings.settings());
            log::info!("⌨️ 窗口快捷键已按新设置重建");
        }
    }

    fn show_status(&mut self, level: StatusLevel, text: String) {
        self.status_seq += 1;
        let id = self.status_seq;
        self.status.send_replace(Some(StatusMessage { id, level, text }));

        let sender = self.sender.clone();
        let ttl = self.config.status_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(Message::DismissStatus(id)).await;
            }
        });
    }
}

fn discard_report(report: IngestReport, previews: &PreviewRegistry) {
    let released = report
        .records
        .into_iter()
        .map(|record| record.release(previews))
        .filter(|released| *released)
        .count();
    if released > 0 {
        log::debug!("释放被丢弃结果中的预览 {}", released);
    }
}
