//! # observer 模块说明
//!
//! ## 角色定位（Why）
//! - 定义套接字对外的六个生命周期/数据通知，全部提供默认空实现，观察者只需
//!   覆写自己关心的成员；
//! - 通过 `Weak` 持有观察者，套接字不延长观察者的生命周期：观察者先行释放时
//!   后续事件被静默跳过，而非悬垂或 panic。

use crate::error::SocketError;
use bytes::Bytes;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// 套接字事件观察者，所有成员均可选实现。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方多数只关心数据与断连，强制实现六个方法会制造样板；
///   默认空实现等价于“未实现的通知被跳过”。
/// - **契约 (What)**：
///   - 所有回调在专用分发任务上按事件产生顺序串行执行，不会与管道任务并发重入；
///   - 回调内不得假定套接字仍处于触发事件时的状态（状态可能已被并发操作推进）；
///   - 实现必须 `Send + Sync`，回调中的长阻塞会延迟后续事件的投递。
/// - **权衡 (Trade-offs)**：采用 trait 默认方法而非逐回调的 `Option<Box<dyn Fn>>`，
///   保持单一注册点与对象安全，代价是无法在运行时逐个替换成员。
pub trait SocketObserver: Send + Sync {
    /// 连接成功，携带解析后的对端地址与端口。
    fn on_connected(&self, peer: IpAddr, port: u16) {
        let _ = (peer, port);
    }

    /// 连接失败（含超时）。
    fn on_connect_failed(&self, error: &SocketError) {
        let _ = error;
    }

    /// 连接被对端关闭。调用方主动 `close()` 不触发本回调。
    fn on_closed(&self) {}

    /// 某条发送失败，携带原始缓冲区与失败原因。
    fn on_send_failed(&self, data: &Bytes, error: &SocketError) {
        let _ = (data, error);
    }

    /// 收到一段字节流数据。
    fn on_data_received(&self, data: &Bytes) {
        let _ = data;
    }

    /// 写通道有新的可写容量。
    fn on_writable(&self) {}
}

/// 观察者槽位：以 `Weak` 存放注册的观察者。
///
/// 分发任务在每次投递前升级引用，升级失败（观察者已释放）时跳过该事件。
#[derive(Debug, Default)]
pub(crate) struct ObserverSlot {
    inner: Mutex<Option<Weak<dyn SocketObserver>>>,
}

impl ObserverSlot {
    /// 注册观察者，覆盖旧值。
    pub(crate) fn store(&self, observer: Weak<dyn SocketObserver>) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(observer);
    }

    /// 尝试升级为强引用；槽位为空或观察者已释放时返回 `None`。
    pub(crate) fn upgrade(&self) -> Option<Arc<dyn SocketObserver>> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref()?.upgrade()
    }
}

#[cfg(test)]
mod tests {
    use super::{ObserverSlot, SocketObserver};
    use std::sync::Arc;

    struct Silent;
    impl SocketObserver for Silent {}

    #[test]
    fn empty_slot_upgrades_to_none() {
        let slot = ObserverSlot::default();
        assert!(slot.upgrade().is_none());
    }

    #[test]
    fn dropped_observer_is_skipped() {
        let slot = ObserverSlot::default();
        let observer: Arc<dyn SocketObserver> = Arc::new(Silent);
        slot.store(Arc::downgrade(&observer));
        assert!(slot.upgrade().is_some());
        drop(observer);
        assert!(slot.upgrade().is_none(), "观察者释放后槽位应升级失败");
    }
}
