// ==========================================
// TIKTUY - 通知列表
// ==========================================
// 职责: 把推送通道收到的通知合并进列表
// 规则: 新通知插到最前；同 ID 重复到达时忽略
// 说明: 推送传输本身（WebSocket）不在本模块
// ==========================================

use crate::domain::notification::Notification;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// 通知接收端（显式依赖，替代全局单例）
pub trait NotificationSink: Send + Sync {
    /// 投递一条通知，返回是否为新通知
    fn deliver(&self, notification: Notification) -> bool;
}

#[derive(Debug, Default)]
pub struct NotificationFeed {
    items: Vec<Notification>,
    seen: HashSet<i64>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以初始列表创建（保持给定顺序，按 ID 去重）
    pub fn with_items(items: Vec<Notification>) -> Self {
        let mut feed = Self::new();
        for n in items {
            if feed.seen.insert(n.id) {
                feed.items.push(n);
            }
        }
        feed
    }

    /// 接收通知（最新在前）
    pub fn receive(&mut self, notification: Notification) -> bool {
        if !self.seen.insert(notification.id) {
            debug!(id = notification.id, "重复通知，忽略");
            return false;
        }
        self.items.insert(0, notification);
        true
    }

    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.leido => {
                n.leido = true;
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut().filter(|n| !n.leido) {
            n.leido = true;
            changed += 1;
        }
        changed
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.leido).count()
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl NotificationSink for Mutex<NotificationFeed> {
    fn deliver(&self, notification: Notification) -> bool {
        // 锁中毒时继续使用内部数据
        let mut feed = match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        feed.receive(notification)
    }
}

pub type SharedFeed = Arc<Mutex<NotificationFeed>>;

/// 把通道中的通知持续投递到接收端，通道关闭后返回新通知数量
pub async fn pump(mut rx: mpsc::Receiver<Notification>, sink: Arc<dyn NotificationSink>) -> usize {
    let mut delivered = 0;
    while let Some(notification) = rx.recv().await {
        if sink.deliver(notification) {
            delivered += 1;
        }
    }
    info!(delivered, "通知通道已关闭");
    delivered
}
