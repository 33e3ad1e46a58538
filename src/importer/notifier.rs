// ==========================================
// 表格批量导入引擎 - 用户通知
// ==========================================
// 职责: report(kind, title, body, persistent) 的抽象与两个实现
// - TracingNotifier: 通过 tracing 输出
// - MemoryNotifier: 记录所有通知（测试用）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Danger,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Danger => write!(f, "danger"),
        }
    }
}

/// 一条用户通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub persistent: bool,
}

impl Notification {
    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            body: body.into(),
            persistent: true,
        }
    }

    pub fn danger(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Danger,
            title: title.into(),
            body: body.into(),
            persistent: true,
        }
    }

    /// 设置是否常驻
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

// ==========================================
// Notifier Trait
// ==========================================
// 用途: 通知投递（发出即忘，不消费返回值）
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

// ==========================================
// TracingNotifier
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!(
                title = %notification.title,
                persistent = notification.persistent,
                "{}",
                notification.body
            ),
            NotificationKind::Danger => warn!(
                title = %notification.title,
                persistent = notification.persistent,
                "{}",
                notification.body
            ),
        }
    }
}

// ==========================================
// MemoryNotifier
// ==========================================
// 克隆后共享同一份记录
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发送通知的快照
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// 最后一条通知
    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
