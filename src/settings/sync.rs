//! 设置广播通道
//!
//! 宿主每次保存设置都会发出一份不可变快照（`Arc<SettingsSnapshot>`），
//! 所有活跃的消费方（捕获窗口、设置窗口）各自合并到本地工作副本。
//! 广播不经过缓冲区的调度队列，不会阻塞文本编辑。

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::{Settings, SettingsSnapshot};

const DEFAULT_CAPACITY: usize = 16;

/// 设置快照广播通道。
#[derive(Debug, Clone)]
pub struct SettingsSyncChannel {
    sender: broadcast::Sender<Arc<SettingsSnapshot>>,
}

impl Default for SettingsSyncChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SettingsSyncChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 广播一份快照，返回收到快照的消费方数量。
    ///
    /// 没有消费方时不视为错误。
    pub fn publish(&self, snapshot: SettingsSnapshot) -> usize {
        match self.sender.send(Arc::new(snapshot)) {
            Ok(receivers) => {
                log::info!("📣 设置快照已广播（消费方={}）", receivers);
                receivers
            }
            Err(_) => {
                log::debug!("设置快照无消费方，已丢弃");
                0
            }
        }
    }

    /// 以给定初始值注册新的消费方。
    pub fn subscribe(&self, initial: Settings) -> SettingsConsumer {
        SettingsConsumer {
            settings: initial,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// 设置消费方：持有本地工作副本，只合并快照中出现的字段。
#[derive(Debug)]
pub struct SettingsConsumer {
    settings: Settings,
    receiver: broadcast::Receiver<Arc<SettingsSnapshot>>,
}

impl SettingsConsumer {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 直接合并一份快照（例如启动时 `load_settings` 的结果）。
    pub fn apply(&mut self, snapshot: &SettingsSnapshot) -> Vec<&'static str> {
        let changed = self.settings.merge(snapshot);
        if !changed.is_empty() {
            log::info!("⚙️ 设置已合并：{:?}", changed);
        }
        changed
    }

    /// 等待下一份快照并合并，返回该快照与变化字段；通道关闭时返回 `None`。
    ///
    /// 消费过慢导致的积压会跳过中间快照并继续。
    pub async fn next_update(&mut self) -> Option<(Arc<SettingsSnapshot>, Vec<&'static str>)> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => {
                    let changed = self.apply(&snapshot);
                    return Some((snapshot, changed));
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("⚠️ 设置消费方积压，跳过 {} 份快照", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// 非阻塞地合并所有已到达的快照，返回合并的快照数量。
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => {
                    self.apply(&snapshot);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("⚠️ 设置消费方积压，跳过 {} 份快照", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return applied,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_consumers_receive_and_merge() {
        let channel = SettingsSyncChannel::default();

        let mut capture = channel.subscribe(Settings::default());
        let mut editor = channel.subscribe(Settings {
            font_size: 20,
            ..Settings::default()
        });
        assert_eq!(channel.consumer_count(), 2);

        let delivered = channel.publish(SettingsSnapshot {
            window_blur: Some(10),
            ..SettingsSnapshot::default()
        });
        assert_eq!(delivered, 2);

        let (_, changed) = capture.next_update().await.expect("capture should receive");
        assert_eq!(changed, vec!["window_blur"]);
        assert_eq!(capture.settings().window_blur, 10);

        editor.next_update().await.expect("editor should receive");
        assert_eq!(editor.settings().window_blur, 10);
        // 快照未携带的字段保持各自的本地值
        assert_eq!(editor.settings().font_size, 20);
        assert_eq!(capture.settings().font_size, 15);
    }

    #[test]
    fn test_publish_without_consumers_is_not_an_error() {
        let channel = SettingsSyncChannel::new(4);
        assert_eq!(channel.publish(SettingsSnapshot::default()), 0);
    }

    #[test]
    fn test_drain_pending_applies_in_order_and_survives_lag() {
        let channel = SettingsSyncChannel::new(2);
        let mut consumer = channel.subscribe(Settings::default());

        for blur in [1, 2, 3, 4] {
            channel.publish(SettingsSnapshot {
                window_blur: Some(blur),
                ..SettingsSnapshot::default()
            });
        }

        let applied = consumer.drain_pending();
        assert_eq!(applied, 2);
        assert_eq!(consumer.settings().window_blur, 4);
    }
}
