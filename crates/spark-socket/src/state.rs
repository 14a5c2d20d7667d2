//! # state 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义套接字生命周期状态与合法跃迁表，作为连接、发送与接收三条路径
//!   判定操作合法性时共同查询的唯一事实来源；
//! - 将跃迁逻辑收敛为纯函数，配合属性测试验证任意输入序列都不会进入未定义状态。
//!
//! ## 设计要求（What）
//! - 状态取值与语义保持与回调契约一致：`Closed` 为初始或终止态，`ConnectFailed`
//!   在显式重新连接前保持不变；
//! - 非法跃迁返回 `None`，调用方保持原状态并自行决定告警或静默；
//! - `Close` 输入在任何状态下都成立，对应调用方的无回调拆除路径。

/// 套接字生命周期状态。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方在发起连接、发送前需要依据当前状态判断操作是否合法，
///   管道任务在异步完成时也要确认状态仍然允许推进，避免迟到事件覆盖新状态。
/// - **契约 (What)**：同一实例任意时刻只有一个状态生效；`Connected` 只能经由
///   `Connecting` 进入；`ConnectFailed` 为吸收态，直至显式 `close`/重连。
/// - **权衡 (Trade-offs)**：采用 `Copy` 枚举而非带数据的状态对象，连接期元数据
///   （目标地址、截止时间）由连接任务自行持有，状态查询因此无锁争用负担。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketState {
    /// 已关闭（初始/终止态）。
    Closed,
    /// 已打开，资源就绪但尚未发起连接。
    Open,
    /// 正在连接。
    Connecting,
    /// 已建立连接。
    Connected,
    /// 连接失败，等待显式关闭后重试。
    ConnectFailed,
}

/// 驱动状态跃迁的输入事件。
///
/// - `Open`/`Connect`/`Close` 来自调用方；
/// - `ConnectSucceeded`/`ConnectFailed` 来自连接任务的完成结果；
/// - `PipelineClosed` 来自发送/接收管道检测到的对端关闭或致命 IO 错误。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StateInput {
    Open,
    Connect,
    ConnectSucceeded,
    ConnectFailed,
    PipelineClosed,
    Close,
}

impl SocketState {
    /// 计算输入事件驱动下的下一个状态；非法跃迁返回 `None`。
    ///
    /// # 教案式说明
    /// - **契约 (What)**：`Connect` 对 `Connecting` 之外的所有状态成立（未打开时
    ///   自动打开）；`PipelineClosed` 仅对 `Connected` 成立，保证两条管道竞争
    ///   关闭时只有第一条生效；`Close` 恒成立。
    /// - **执行 (How)**：纯函数查表，不产生副作用；调用方负责在返回 `Some` 时
    ///   原子地写回新状态。
    pub(crate) fn next(self, input: StateInput) -> Option<SocketState> {
        match (self, input) {
            (SocketState::Closed, StateInput::Open) => Some(SocketState::Open),
            (
                SocketState::Closed
                | SocketState::Open
                | SocketState::Connected
                | SocketState::ConnectFailed,
                StateInput::Connect,
            ) => Some(SocketState::Connecting),
            (SocketState::Connecting, StateInput::ConnectSucceeded) => Some(SocketState::Connected),
            (SocketState::Connecting, StateInput::ConnectFailed) => Some(SocketState::ConnectFailed),
            (SocketState::Connected, StateInput::PipelineClosed) => Some(SocketState::Closed),
            (_, StateInput::Close) => Some(SocketState::Closed),
            _ => None,
        }
    }
}
