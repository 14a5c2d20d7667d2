//! # send 管道说明
//!
//! ## 角色定位（Why）
//! - 独占连接的写半部，逐条排空发送队列：同一时刻只处理一条待发项，部分写出
//!   的剩余字节保留在队头重试，保证字节序与提交序一致；
//! - 每条待发项的截止时间由任务内的 `timeout_at` 守护，条目被本任务独占处理，
//!   超时与完成互斥成立，不存在“已完成又超时”的双重上报。
//!
//! ## 设计要求（What）
//! - 单条超时只丢弃该条目并继续后续队列（逐条超时语义，连接不因此关闭）；
//! - 写路径 IO 错误是致命的：上报该条目的发送失败后整体终结连接，剩余队列
//!   随通道一并丢弃；
//! - 队列被排空（完整写出且暂无后续条目）时发出一次可写通知，提示调用方
//!   有新的发送容量。

use crate::error::SocketError;
use crate::event::SocketEvent;
use crate::socket::SocketCore;
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// 发送队列中的待发项：缓冲区 + 入队时刻换算出的截止时间。
#[derive(Debug)]
pub(crate) struct SendItem {
    pub(crate) data: Bytes,
    pub(crate) deadline: Option<Instant>,
}

enum FlushOutcome {
    /// 缓冲区完整写出。
    Flushed,
    /// 截止时间先于完整写出到来。
    TimedOut,
    /// 写路径发生致命 IO 错误。
    Failed(io::Error),
}

/// 发送管道主循环。
pub(crate) async fn run(
    core: Arc<SocketCore>,
    epoch: u64,
    mut writer: OwnedWriteHalf,
    mut queue: UnboundedReceiver<SendItem>,
    events: UnboundedSender<(u64, SocketEvent)>,
) {
    while let Some(item) = queue.recv().await {
        match flush_item(&mut writer, &item).await {
            FlushOutcome::Flushed => {
                tracing::debug!(len = item.data.len(), "发送条目完整写出");
                if queue.is_empty() {
                    let _ = events.send((epoch, SocketEvent::Writable));
                }
            }
            FlushOutcome::TimedOut => {
                // 超时仅作用于当前条目，后续队列继续尝试。
                let _ = events.send((
                    epoch,
                    SocketEvent::SendFailed {
                        data: item.data,
                        error: SocketError::send_timeout(),
                    },
                ));
            }
            FlushOutcome::Failed(err) => {
                tracing::warn!(error = %err, "写路径致命错误，终结连接");
                core.close_from_pipeline(
                    epoch,
                    SocketEvent::SendFailed {
                        data: item.data,
                        error: SocketError::send_io(err),
                    },
                );
                return;
            }
        }
    }
}

/// 将单条待发项完整写入套接字，容忍部分写出并按原始字节序续写。
async fn flush_item(writer: &mut OwnedWriteHalf, item: &SendItem) -> FlushOutcome {
    let mut offset = 0;
    while offset < item.data.len() {
        let written = match item.deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, writer.write(&item.data[offset..])).await {
                    Ok(result) => result,
                    Err(_) => return FlushOutcome::TimedOut,
                }
            }
            None => writer.write(&item.data[offset..]).await,
        };
        match written {
            Ok(0) => {
                return FlushOutcome::Failed(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "socket accepted zero bytes",
                ));
            }
            Ok(n) => offset += n,
            Err(err) => return FlushOutcome::Failed(err),
        }
    }
    FlushOutcome::Flushed
}
