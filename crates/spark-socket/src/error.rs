//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为连接、发送、接收三条路径的失败提供统一的错误域，保证观察者回调拿到的
//!   错误携带稳定的机读错误码与可读描述；
//! - 错误码遵循 `<域>.<语义>` 约定（`socket.*` 命名空间），便于日志、指标与
//!   告警系统按码值执行精确分类。
//!
//! ## 设计要求（What）
//! - 所有错误实现 `thiserror::Error`，保持与 `std::error::Error` 生态兼容；
//! - 底层 `std::io::Error` 通过 `source()` 暴露完整链路，不在消息中重复拼接；
//! - 错误仅承载信息，不触发任何状态跃迁或回调，由产生错误的管道自行处置。

use crate::state::SocketState;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// 稳定错误码清单。
///
/// 调用方若需按码值归档或告警，应引用本模块常量而非手写字符串。
pub mod codes {
    /// 连接在截止时间前未完成。
    pub const CONNECT_TIMEOUT: &str = "socket.connect.timeout";
    /// 连接被拒绝、不可达或端口无法解析。
    pub const CONNECT_FAILED: &str = "socket.connect.failed";
    /// 在非 `Connected` 状态下发起了发送。
    pub const NOT_CONNECTED: &str = "socket.not_connected";
    /// 单条发送在截止时间前未完全写出。
    pub const SEND_TIMEOUT: &str = "socket.send.timeout";
    /// 写路径发生致命 IO 错误。
    pub const SEND_IO: &str = "socket.send.io";
    /// 读路径发生致命 IO 错误。
    pub const RECV_IO: &str = "socket.recv.io";
}

/// 错误分类，对应回调契约中约定的失败种类。
///
/// # 教案式说明
/// - **意图 (Why)**：观察者通常依据“哪一类失败”决定重试或放弃，枚举比字符串
///   匹配更稳定；
/// - **契约 (What)**：每个分类与 [`codes`] 中的常量一一对应；`SendTimeout`
///   仅影响超时的那一条发送，其余分类（除 `NotConnected`）都伴随连接终结。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketErrorKind {
    /// 连接超时。
    ConnectTimeout,
    /// 连接失败（拒绝/不可达/端口非法）。
    ConnectFailed,
    /// 未连接即发送。
    NotConnected,
    /// 发送超时。
    SendTimeout,
    /// 发送 IO 错误。
    SendIo,
    /// 接收 IO 错误。
    RecvIo,
}

impl SocketErrorKind {
    /// 返回该分类对应的稳定错误码。
    pub fn code(self) -> &'static str {
        match self {
            SocketErrorKind::ConnectTimeout => codes::CONNECT_TIMEOUT,
            SocketErrorKind::ConnectFailed => codes::CONNECT_FAILED,
            SocketErrorKind::NotConnected => codes::NOT_CONNECTED,
            SocketErrorKind::SendTimeout => codes::SEND_TIMEOUT,
            SocketErrorKind::SendIo => codes::SEND_IO,
            SocketErrorKind::RecvIo => codes::RECV_IO,
        }
    }
}

/// 套接字错误载体：分类 + 稳定错误码 + 可读描述 + 可选底层原因。
///
/// # 教案式说明
/// - **意图 (Why)**：所有异步失败最终都以一次回调呈现给观察者，错误体需要同时
///   满足机读（`kind`/`code`）与排障（`message`/`source`）两类需求。
/// - **契约 (What)**：`Send + Sync + 'static`，可跨任务传递；`message` 不含敏感
///   信息；`source` 仅在底层确有 `std::io::Error` 时存在。
/// - **权衡 (Trade-offs)**：消息采用 `Cow<'static, str>`，静态文案零分配，动态
///   上下文（目标状态、超时时长）按需分配一次。
#[derive(Debug, Error)]
#[error("{}: {}", .kind.code(), .message)]
pub struct SocketError {
    kind: SocketErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<std::io::Error>,
}

impl SocketError {
    /// 构造不带底层原因的错误。
    pub fn new(kind: SocketErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// 构造携带底层 IO 原因的错误。
    pub fn with_source(
        kind: SocketErrorKind,
        message: impl Into<Cow<'static, str>>,
        source: std::io::Error,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source),
        }
    }

    /// 连接超时。
    pub(crate) fn connect_timeout(budget: Duration) -> Self {
        Self::new(
            SocketErrorKind::ConnectTimeout,
            format!("connect did not complete within {budget:?}"),
        )
    }

    /// 连接阶段的 IO 失败（拒绝、不可达等）。
    pub(crate) fn connect_io(source: std::io::Error) -> Self {
        Self::with_source(SocketErrorKind::ConnectFailed, "connect failed", source)
    }

    /// 连接阶段的非 IO 失败（例如端口无法解析）。
    pub(crate) fn connect_rejected(message: String) -> Self {
        Self::new(SocketErrorKind::ConnectFailed, message)
    }

    /// 未连接即发送。
    pub(crate) fn not_connected(state: SocketState) -> Self {
        Self::new(
            SocketErrorKind::NotConnected,
            format!("send requires Connected state, socket is {state:?}"),
        )
    }

    /// 单条发送超时。
    pub(crate) fn send_timeout() -> Self {
        Self::new(
            SocketErrorKind::SendTimeout,
            "send deadline expired before the buffer was fully flushed",
        )
    }

    /// 写路径致命 IO 错误。
    pub(crate) fn send_io(source: std::io::Error) -> Self {
        Self::with_source(SocketErrorKind::SendIo, "send failed", source)
    }

    /// 获取错误分类。
    pub fn kind(&self) -> SocketErrorKind {
        self.kind
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// 获取可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::{SocketError, SocketErrorKind, codes};
    use crate::state::SocketState;
    use std::error::Error;

    #[test]
    fn kinds_map_to_stable_codes() {
        assert_eq!(SocketErrorKind::ConnectTimeout.code(), codes::CONNECT_TIMEOUT);
        assert_eq!(SocketErrorKind::ConnectFailed.code(), codes::CONNECT_FAILED);
        assert_eq!(SocketErrorKind::NotConnected.code(), codes::NOT_CONNECTED);
        assert_eq!(SocketErrorKind::SendTimeout.code(), codes::SEND_TIMEOUT);
        assert_eq!(SocketErrorKind::SendIo.code(), codes::SEND_IO);
        assert_eq!(SocketErrorKind::RecvIo.code(), codes::RECV_IO);
    }

    #[test]
    fn display_carries_code_and_message() {
        let err = SocketError::not_connected(SocketState::Open);
        let rendered = err.to_string();
        assert!(rendered.starts_with(codes::NOT_CONNECTED), "{rendered}");
        assert!(rendered.contains("Open"), "{rendered}");
    }

    #[test]
    fn io_source_is_exposed_through_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer reset");
        let err = SocketError::send_io(io);
        assert_eq!(err.kind(), SocketErrorKind::SendIo);
        assert!(err.source().is_some(), "底层 IO 错误应通过 source() 暴露");
    }
}
