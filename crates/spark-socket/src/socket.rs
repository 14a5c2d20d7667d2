//! # socket 模块说明
//!
//! ## 角色定位（Why）
//! - 对外暴露 [`TcpSocket`] 实例类型，聚合状态机、事件集线器与两条管道的
//!   装配/拆除逻辑；
//! - 所有公开操作均不阻塞调用方：可能阻塞的系统调用都被派发到各自的后台
//!   任务，失败通过观察者回调上报而非返回值。

use crate::config::{SocketConfig, timeout_budget};
use crate::error::SocketError;
use crate::event::{EventHub, SocketEvent};
use crate::observer::{ObserverSlot, SocketObserver};
use crate::pipeline::{self, send::SendItem};
use crate::state::{SocketState, StateInput};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 客户端异步 TCP 套接字，一个实例对应一次连接尝试/生命周期。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 为应用代码提供“打开 → 连接 → 收发 → 关闭”的顺序调用语义，把底层非阻塞
///   套接字的就绪驱动模型完全隐藏在后台任务内；
/// - 生命周期事件与数据通过 [`SocketObserver`] 回调上报，调用方无需轮询。
///
/// ## 逻辑 (How)
/// - 内部以 `Arc<SocketCore>` 共享核心：状态机（互斥保护）、观察者槽位
///   （`Weak` 持有）与按生命周期装配的资源（事件集线器、任务句柄、发送队列）；
/// - 发送与接收各占一条串行任务，分别独占写半部/读半部，互不等待；
/// - 每次连接尝试开启一个“代际”（`AtomicU64`），`close()` 与重连递增代际，
///   迟到的连接结果与排队事件按代际被丢弃，保证主动关闭零回调。
///
/// ## 契约 (What)
/// - 所有方法必须在 Tokio 运行时内调用（内部需要 `tokio::spawn`）；
/// - `open`/`connect`/`send`/`close` 均立即返回；状态查询见 [`Self::state`]；
/// - 实例被 drop 时等价于 `close()`：静默拆除全部后台任务。
///
/// ## 注意事项 (Trade-offs)
/// - 发送队列无界且不做隐式背压，调用方应依据 `on_writable` 自行节流；
/// - 观察者回调串行执行，回调内长阻塞会推迟后续事件（但不会阻塞 IO 管道本身）。
#[derive(Debug)]
pub struct TcpSocket {
    core: Arc<SocketCore>,
}

/// 单个生命周期（一次 open 或一次连接尝试）所持有的资源。
///
/// `Drop` 时中止全部任务：事件集线器内的分发任务随 [`EventHub`] 一并中止，
/// 发送队列发送端随之释放。
struct Lifetime {
    events: EventHub,
    tasks: Vec<JoinHandle<()>>,
    send_tx: Option<UnboundedSender<SendItem>>,
}

impl Lifetime {
    /// 装配新生命周期：创建事件通道并拉起分发任务。
    fn arm(core: &Arc<SocketCore>) -> Self {
        Self {
            events: EventHub::spawn(core.generation.clone(), core.observer.clone()),
            tasks: Vec::new(),
            send_tx: None,
        }
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifetime")
            .field("tasks", &self.tasks.len())
            .field("send_armed", &self.send_tx.is_some())
            .finish()
    }
}

/// 套接字共享核心。
///
/// 锁序固定为 `state` → `lifetime`，所有路径一致，避免交叉死锁。
#[derive(Debug)]
pub(crate) struct SocketCore {
    state: Mutex<SocketState>,
    lifetime: Mutex<Option<Lifetime>>,
    generation: Arc<AtomicU64>,
    observer: Arc<ObserverSlot>,
    config: SocketConfig,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TcpSocket {
    /// 以默认配置构造处于 `Closed` 状态的实例。
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// 以指定配置构造实例。
    pub fn with_config(config: SocketConfig) -> Self {
        Self {
            core: Arc::new(SocketCore {
                state: Mutex::new(SocketState::Closed),
                lifetime: Mutex::new(None),
                generation: Arc::new(AtomicU64::new(0)),
                observer: Arc::new(ObserverSlot::default()),
                config,
            }),
        }
    }

    /// 注册观察者（以 `Weak` 持有，不延长其生命周期）。
    ///
    /// 应在 `connect` 之前注册，晚注册不回放此前的事件。
    pub fn set_observer<O: SocketObserver + 'static>(&self, observer: &Arc<O>) {
        let weak = Arc::downgrade(observer);
        let weak: std::sync::Weak<dyn SocketObserver> = weak;
        self.core.observer.store(weak);
    }

    /// 读取当前状态。
    pub fn state(&self) -> SocketState {
        *lock(&self.core.state)
    }

    /// 打开套接字：装配事件分发资源，`Closed → Open`。
    ///
    /// 在非 `Closed` 状态下调用是调用方错误，记录告警后忽略，不破坏现有状态。
    pub fn open(&self) {
        let mut state = lock(&self.core.state);
        let Some(next) = state.next(StateInput::Open) else {
            tracing::warn!(state = ?*state, "open 被忽略：仅允许在 Closed 状态调用");
            return;
        };
        let mut lifetime = lock(&self.core.lifetime);
        *lifetime = Some(Lifetime::arm(&self.core));
        *state = next;
        tracing::debug!("套接字已打开");
    }

    /// 关闭套接字：任意状态下无条件转入 `Closed`。
    ///
    /// 这是唯一的零回调拆除路径——递增代际使排队事件全部失效，并中止分发任务
    /// 与两条管道；进行中的系统调用允许自行完成，但其结果会按代际被丢弃。
    pub fn close(&self) {
        self.core.close_silently();
    }

    /// 连接到 `host:port`，结果经由 `on_connected`/`on_connect_failed` 上报。
    ///
    /// # 教案式说明
    /// - **契约 (What)**：
    ///   - 未打开时自动打开；从 `Connected`/`ConnectFailed` 发起时，先静默拆除
    ///     旧生命周期（等价于一次 `close`）再开始全新尝试；
    ///   - `Connecting` 期间重复调用被拒绝（告警，无回调）；
    ///   - `timeout_secs < 0` 表示无截止时间，连接在后台无限期进行；
    ///   - `port` 为十进制端口字符串，解析失败以 `on_connect_failed` 上报。
    /// - **执行 (How)**：状态置为 `Connecting` 后派发连接任务；任务完成时经
    ///   [`SocketCore::finish_connect`] 按代际核验，再推进状态并装配管道。
    pub fn connect(&self, host: &str, port: &str, timeout_secs: f64) {
        let core = &self.core;
        let mut state = lock(&core.state);
        let Some(next) = state.next(StateInput::Connect) else {
            tracing::warn!(state = ?*state, "connect 被忽略：上一次连接仍在进行");
            return;
        };
        let mut lifetime = lock(&core.lifetime);
        if *state != SocketState::Open {
            // 全新尝试：旧生命周期（若有）静默拆除，排队事件按代际失效。
            core.generation.fetch_add(1, Ordering::AcqRel);
            *lifetime = Some(Lifetime::arm(core));
        }
        *state = next;

        let epoch = core.generation.load(Ordering::Acquire);
        let budget = timeout_budget(timeout_secs);
        let task = tokio::spawn(pipeline::drive_connect(
            Arc::clone(core),
            epoch,
            host.to_owned(),
            port.to_owned(),
            budget,
        ));
        if let Some(active) = lifetime.as_mut() {
            active.tasks.push(task);
        }
        tracing::debug!(host, port, ?budget, "开始连接");
    }

    /// 发送数据，截止时间按调用时刻起算。
    ///
    /// # 教案式说明
    /// - **契约 (What)**：
    ///   - 仅 `Connected` 状态下入队；`Open`/`Connecting`/`ConnectFailed` 状态
    ///     立即以 `on_send_failed`（NotConnected）上报；
    ///   - `Closed` 状态下静默拒绝——关闭后的任何操作都不得再触发回调；
    ///   - 条目按 FIFO 排空，后发条目不会超越先发条目。
    /// - **执行 (How)**：在状态快照与入队之间存在与并发关闭的竞争窗口，此时
    ///   队列接收端已被中止，条目被静默丢弃，与“关闭零回调”契约一致。
    pub fn send(&self, data: Bytes, timeout_secs: f64) {
        let state = self.state();
        match state {
            SocketState::Connected => {}
            SocketState::Closed => {
                tracing::debug!("send 被忽略：套接字已关闭");
                return;
            }
            _ => {
                let epoch = self.core.generation.load(Ordering::Acquire);
                let lifetime = lock(&self.core.lifetime);
                if let Some(active) = lifetime.as_ref() {
                    active.events.emit(
                        epoch,
                        SocketEvent::SendFailed {
                            data,
                            error: SocketError::not_connected(state),
                        },
                    );
                }
                return;
            }
        }

        let deadline = timeout_budget(timeout_secs).map(|budget| Instant::now() + budget);
        let lifetime = lock(&self.core.lifetime);
        let queued = lifetime
            .as_ref()
            .and_then(|active| active.send_tx.as_ref())
            .map(|tx| tx.send(SendItem { data, deadline }));
        if !matches!(queued, Some(Ok(()))) {
            tracing::debug!("send 被丢弃：连接在入队前已被并发拆除");
        }
    }
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        self.core.close_silently();
    }
}

impl SocketCore {
    /// 零回调拆除：递增代际、状态置 `Closed`、释放生命周期资源。
    fn close_silently(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut state = lock(&self.state);
        // Close 输入恒成立。
        if let Some(next) = state.next(StateInput::Close) {
            *state = next;
        }
        let mut lifetime = lock(&self.lifetime);
        if lifetime.take().is_some() {
            tracing::debug!("套接字已静默关闭");
        }
    }

    /// 连接任务的统一收口：按代际与状态核验后推进状态机。
    ///
    /// - 成功：装配发送/接收管道，依次投递 `Connected` 与 `Writable`；
    /// - 失败：状态转入 `ConnectFailed` 并投递 `ConnectFailed` 事件；
    /// - 代际不匹配或状态已离开 `Connecting`（并发 `close`）：结果静默丢弃，
    ///   已建立的流随之释放。
    pub(crate) fn finish_connect(
        core: &Arc<Self>,
        epoch: u64,
        outcome: Result<(TcpStream, SocketAddr), SocketError>,
    ) {
        match outcome {
            Ok((stream, peer)) => {
                let mut state = lock(&core.state);
                if core.generation.load(Ordering::Acquire) != epoch {
                    tracing::debug!("连接结果过期，丢弃已建立的流");
                    return;
                }
                let Some(next) = state.next(StateInput::ConnectSucceeded) else {
                    return;
                };
                let mut lifetime = lock(&core.lifetime);
                let Some(active) = lifetime.as_mut() else {
                    return;
                };
                *state = next;

                let (reader, writer) = stream.into_split();
                let (send_tx, send_rx) = mpsc::unbounded_channel();
                active.tasks.push(tokio::spawn(pipeline::send::run(
                    Arc::clone(core),
                    epoch,
                    writer,
                    send_rx,
                    active.events.sender(),
                )));
                active.tasks.push(tokio::spawn(pipeline::recv::run(
                    Arc::clone(core),
                    epoch,
                    reader,
                    active.events.sender(),
                    core.config.recv_buffer_size,
                )));
                active.send_tx = Some(send_tx);
                active.events.emit(
                    epoch,
                    SocketEvent::Connected {
                        peer: peer.ip(),
                        port: peer.port(),
                    },
                );
                active.events.emit(epoch, SocketEvent::Writable);
                tracing::debug!(peer = %peer, "连接成功");
            }
            Err(error) => {
                let mut state = lock(&core.state);
                if core.generation.load(Ordering::Acquire) != epoch {
                    return;
                }
                let Some(next) = state.next(StateInput::ConnectFailed) else {
                    return;
                };
                *state = next;
                let lifetime = lock(&core.lifetime);
                if let Some(active) = lifetime.as_ref() {
                    active.events.emit(epoch, SocketEvent::ConnectFailed { error });
                }
                tracing::debug!("连接失败");
            }
        }
    }

    /// 管道发起的连接终结（对端关闭或致命 IO 错误）。
    ///
    /// 与 [`close_silently`](Self::close_silently) 不同：代际不递增，`final_event`
    /// 与此前排队的事件仍会按序投递；两条管道竞争终结时，状态机保证只有第一条
    /// 生效（`PipelineClosed` 仅对 `Connected` 成立）。
    pub(crate) fn close_from_pipeline(&self, epoch: u64, final_event: SocketEvent) {
        let mut state = lock(&self.state);
        if self.generation.load(Ordering::Acquire) != epoch {
            return;
        }
        let Some(next) = state.next(StateInput::PipelineClosed) else {
            return;
        };
        *state = next;
        let mut lifetime = lock(&self.lifetime);
        if let Some(active) = lifetime.as_mut() {
            active.send_tx = None;
            for task in active.tasks.drain(..) {
                task.abort();
            }
            active.events.emit(epoch, final_event);
        }
        tracing::debug!("连接由管道终结");
    }
}
