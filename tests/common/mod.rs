// 集成测试共用的内存宿主与等待工具
#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use note_capture::host::{CaptureHost, HostError, HostResult, SavedImage};
use note_capture::settings::SettingsSnapshot;
use tokio::sync::watch;

#[derive(Debug, Default)]
pub struct Calls {
    pub saved: Vec<String>,
    pub daily: Vec<String>,
    pub notes: Vec<String>,
    pub hides: usize,
    pub settings_opened: usize,
}

pub struct MemoryHost {
    pub native_drag: bool,
    pub runtime: bool,
    pub save_delay: Duration,
    pub fail_submit: bool,
    pub settings: SettingsSnapshot,
    pub calls: Mutex<Calls>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            native_drag: true,
            runtime: true,
            save_delay: Duration::ZERO,
            fail_submit: false,
            settings: SettingsSnapshot::default(),
            calls: Mutex::new(Calls::default()),
        }
    }
}

impl MemoryHost {
    pub fn calls<T>(&self, read: impl FnOnce(&Calls) -> T) -> T {
        let calls = self.calls.lock().expect("calls lock poisoned");
        read(&calls)
    }

    async fn store(&self, filename: &str) -> HostResult<SavedImage> {
        if !self.save_delay.is_zero() {
            tokio::time::sleep(self.save_delay).await;
        }
        if filename.starts_with("broken") {
            return Err(HostError::from("cannot write asset"));
        }
        self.calls
            .lock()
            .map_err(|_| HostError::from("calls lock poisoned"))?
            .saved
            .push(filename.to_string());
        Ok(SavedImage {
            markdown: SavedImage::embed_markdown(filename, Some("600")),
            saved_path: format!("/vault/assets/{}", filename),
            filename: filename.to_string(),
        })
    }
}

impl CaptureHost for MemoryHost {
    fn runtime_available(&self) -> bool {
        self.runtime
    }

    fn native_drag_available(&self) -> bool {
        self.native_drag
    }

    async fn save_image(&self, path: &str) -> HostResult<SavedImage> {
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        self.store(&filename).await
    }

    async fn save_image_from_bytes(
        &self,
        base64_data: String,
        filename: &str,
    ) -> HostResult<SavedImage> {
        if base64_data.is_empty() {
            return Err(HostError::from("empty payload"));
        }
        self.store(filename).await
    }

    async fn load_settings(&self) -> HostResult<SettingsSnapshot> {
        Ok(self.settings.clone())
    }

    async fn append_to_daily_note(&self, text: &str) -> HostResult<()> {
        if self.fail_submit {
            return Err(HostError::from("daily note is locked"));
        }
        self.calls
            .lock()
            .map_err(|_| HostError::from("calls lock poisoned"))?
            .daily
            .push(text.to_string());
        Ok(())
    }

    async fn save_as_note(&self, text: &str) -> HostResult<String> {
        if self.fail_submit {
            return Err(HostError::from("vault is read-only"));
        }
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| HostError::from("calls lock poisoned"))?;
        calls.notes.push(text.to_string());
        Ok(format!("Capture {}", calls.notes.len()))
    }

    async fn hide_capture(&self) -> HostResult<()> {
        self.calls
            .lock()
            .map_err(|_| HostError::from("calls lock poisoned"))?
            .hides += 1;
        Ok(())
    }

    async fn open_settings(&self) -> HostResult<()> {
        self.calls
            .lock()
            .map_err(|_| HostError::from("calls lock poisoned"))?
            .settings_opened += 1;
        Ok(())
    }
}

/// 等待 watch 通道满足条件并返回当时的值。
pub async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for watch value")
        .map(|value| (*value).clone())
        .expect("watch channel closed")
}

/// 轮询直到条件成立。
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
