//! # event 模块说明
//!
//! ## 角色定位（Why）
//! - 把两条管道与连接任务产生的通知收拢到单一 FIFO 通道，由专用分发任务投递，
//!   保证“事件产生顺序 = 投递顺序”，且回调不在管道任务上内联执行；
//! - 以代际（epoch）标记隔离生命周期：`close()`/重连递增代际计数，分发任务
//!   丢弃旧代际排队事件，从而实现“主动关闭零回调”。

use crate::observer::{ObserverSlot, SocketObserver};
use bytes::Bytes;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// 管道产生的通知事件，与观察者的六个回调一一对应。
#[derive(Debug)]
pub(crate) enum SocketEvent {
    /// 连接成功。
    Connected { peer: IpAddr, port: u16 },
    /// 连接失败。
    ConnectFailed { error: crate::error::SocketError },
    /// 对端关闭（或读路径致命错误后的终结信号）。
    Closed,
    /// 某条发送失败。
    SendFailed {
        data: Bytes,
        error: crate::error::SocketError,
    },
    /// 收到数据。
    DataReceived { data: Bytes },
    /// 写通道有新容量。
    Writable,
}

/// 事件集线器：FIFO 通道发送端 + 分发任务句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：管道任务产出事件后立即返回继续 IO，投递与观察者回调的
///   耗时被隔离到分发任务；单通道天然保序。
/// - **契约 (What)**：
///   - `emit` 永不阻塞（无界通道），失败（分发任务已终止）时静默丢弃；
///   - 分发任务在交付 `Closed` 后终止，同代际的后续事件不再投递；
///   - `Drop` 时中止分发任务，未投递事件随之丢弃。
/// - **权衡 (Trade-offs)**：无界通道意味着不做隐式背压，与发送队列的契约一致，
///   由调用方依据 `on_writable` 自行节流。
pub(crate) struct EventHub {
    tx: UnboundedSender<(u64, SocketEvent)>,
    dispatcher: JoinHandle<()>,
}

impl EventHub {
    /// 创建通道并拉起分发任务。必须在 Tokio 运行时内调用。
    pub(crate) fn spawn(generation: Arc<AtomicU64>, observer: Arc<ObserverSlot>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(rx, generation, observer));
        Self { tx, dispatcher }
    }

    /// 以指定代际入队一个事件。
    pub(crate) fn emit(&self, epoch: u64, event: SocketEvent) {
        let _ = self.tx.send((epoch, event));
    }

    /// 克隆发送端，供管道任务直接入队。
    pub(crate) fn sender(&self) -> UnboundedSender<(u64, SocketEvent)> {
        self.tx.clone()
    }
}

impl Drop for EventHub {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// 分发循环：逐条取出事件，校验代际后升级观察者并投递。
///
/// - 代际不匹配的事件属于已被关闭/重连终结的生命周期，直接丢弃；
/// - `Closed` 是终结事件，投递后循环退出，同一生命周期不会再有可见回调。
async fn dispatch(
    mut rx: UnboundedReceiver<(u64, SocketEvent)>,
    generation: Arc<AtomicU64>,
    observer: Arc<ObserverSlot>,
) {
    while let Some((epoch, event)) = rx.recv().await {
        if generation.load(Ordering::Acquire) != epoch {
            tracing::debug!(?event, epoch, "丢弃过期代际的事件");
            continue;
        }
        let terminal = matches!(event, SocketEvent::Closed);
        match observer.upgrade() {
            Some(target) => deliver(&*target, &event),
            None => tracing::debug!(?event, "观察者已释放，跳过投递"),
        }
        if terminal {
            break;
        }
    }
}

fn deliver(observer: &dyn SocketObserver, event: &SocketEvent) {
    match event {
        SocketEvent::Connected { peer, port } => observer.on_connected(*peer, *port),
        SocketEvent::ConnectFailed { error } => observer.on_connect_failed(error),
        SocketEvent::Closed => observer.on_closed(),
        SocketEvent::SendFailed { data, error } => observer.on_send_failed(data, error),
        SocketEvent::DataReceived { data } => observer.on_data_received(data),
        SocketEvent::Writable => observer.on_writable(),
    }
}
