//! 集成测试公共设施：记录型观察者。
//!
//! - **Why**：所有回调契约断言都归结为“观察到了哪些事件、以什么顺序”，用一个
//!   线程安全的记录器统一承接，避免每个用例手写通道拼装；
//! - **How**：回调把事件压入互斥保护的向量并唤醒等待者；用例通过 `wait_until`
//!   以谓词轮询 + 通知等待的方式同步，整体受 10 秒兜底超时保护。

#![allow(dead_code)]

use bytes::Bytes;
use spark_socket::{SocketError, SocketErrorKind, SocketObserver};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// 观察到的事件快照，仅保留断言所需的字段。
#[derive(Clone, Debug, PartialEq)]
pub enum Observed {
    Connected(IpAddr, u16),
    ConnectFailed(SocketErrorKind),
    Closed,
    SendFailed(SocketErrorKind, Bytes),
    Data(Bytes),
    Writable,
}

pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
    notify: Notify,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            notify: Notify::new(),
        })
    }

    fn push(&self, event: Observed) {
        self.events.lock().expect("事件记录锁").push(event);
        self.notify.notify_waiters();
    }

    /// 当前事件序列的拷贝。
    pub fn snapshot(&self) -> Vec<Observed> {
        self.events.lock().expect("事件记录锁").clone()
    }

    /// 满足谓词的事件数量。
    pub fn count(&self, pred: impl Fn(&Observed) -> bool) -> usize {
        self.snapshot().iter().filter(|event| pred(event)).count()
    }

    /// 等待事件序列满足谓词，10 秒未满足则 panic 并打印已见序列。
    pub async fn wait_until(&self, what: &str, pred: impl Fn(&[Observed]) -> bool) {
        let waited = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let notified = self.notify.notified();
                if pred(&self.snapshot()) {
                    return;
                }
                notified.await;
            }
        })
        .await;
        if waited.is_err() {
            panic!("等待事件超时：{what}；已观察到 {:?}", self.snapshot());
        }
    }
}

impl SocketObserver for RecordingObserver {
    fn on_connected(&self, peer: IpAddr, port: u16) {
        self.push(Observed::Connected(peer, port));
    }

    fn on_connect_failed(&self, error: &SocketError) {
        self.push(Observed::ConnectFailed(error.kind()));
    }

    fn on_closed(&self) {
        self.push(Observed::Closed);
    }

    fn on_send_failed(&self, data: &Bytes, error: &SocketError) {
        self.push(Observed::SendFailed(error.kind(), data.clone()));
    }

    fn on_data_received(&self, data: &Bytes) {
        self.push(Observed::Data(data.clone()));
    }

    fn on_writable(&self) {
        self.push(Observed::Writable);
    }
}
