//! # 笔记捕获窗口 — 库入口
//!
//! 捕获窗口是一个小型浮动编辑器：用户输入文字、拖入图片，一键追加到今日日记
//! 或另存为独立笔记。本库是它与宿主无关的核心，负责快捷键匹配、拖放状态、
//! 图片导入、插入位置计算、缓冲区管理与设置同步。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              捕获窗口 UI（WebView / 测试脚本）             │
//! │     按键 · 编辑 · DOM 拖放 · 布局        ↑ 快照 · 状态     │
//! └───────┼──────────────────────────────────┼───────────────┘
//!         ↓ WindowEvent (mpsc)               │ watch
//! ┌───────┼──────────────────────────────────┼───────────────┐
//! │  session ── CaptureSession（单任务串行处理）              │
//! │    ├─ shortcut ─── 窗口快捷键匹配                        │
//! │    ├─ drag ─────── 拖放状态机 → DropBatch                 │
//! │    ├─ insertion ── 插入位置计算                          │
//! │    ├─ ingest ───── 并发导入 → IngestReport               │
//! │    └─ buffer ───── 正文 + 图片记录 + 预览释放            │
//! │                                                          │
//! │  settings ── 设置模型 + 广播通道（broadcast）             │
//! │  error ───── AppError          log_safety ── 日志脱敏     │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ CaptureHost（保存图片 · 写笔记 · 窗口管理）
//!                     桌面宿主 / 测试替身
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`host`] | 宿主能力 trait `CaptureHost` |
//! | [`shortcut`] | 快捷键解析与匹配、全局快捷键校验 |
//! | [`drag`] | DOM / 原生拖放事件归一为同一状态机 |
//! | [`ingest`] | 拖放条目分类、委托宿主保存、预览分配 |
//! | [`insertion`] | 根据光标或拖放坐标计算插入偏移 |
//! | [`buffer`] | 捕获缓冲区与图片记录 |
//! | [`settings`] | 设置模型、校验与广播同步 |
//! | [`session`] | 事件队列与异步结果回流 |
//! | [`log_safety`] | 日志中的路径与正文脱敏 |

pub mod buffer;
pub mod drag;
pub mod error;
pub mod host;
pub mod ingest;
pub mod insertion;
pub mod log_safety;
pub mod session;
pub mod settings;
pub mod shortcut;

pub use error::AppError;
pub use host::{CaptureHost, HostError, HostResult, SavedImage};
pub use session::{CaptureSession, SessionConfig, SessionHandle, WindowEvent};
