//! # recv 管道说明
//!
//! ## 角色定位（Why）
//! - 独占连接的读半部，按轮次把可读数据排空进固定容量的暂存缓冲区，并原样
//!   转发给观察者；接收与发送互不等待，仅通过状态机与关闭路径同步；
//! - 零长读取代表对端主动关闭：终结连接并投递一次 `Closed`；读错误是致命的，
//!   观察者界面没有独立的接收失败回调，错误细节记入日志后同样以 `Closed`
//!   収束（详见 DESIGN.md 的决策记录）。

use crate::event::SocketEvent;
use crate::socket::SocketCore;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc::UnboundedSender;

/// 接收管道主循环。
///
/// # 教案式说明
/// - **契约 (What)**：数据块按字节流顺序投递，单块长度不超过 `buffer_size`；
///   循环只会以三种方式退出——对端关闭、读错误、或任务被关闭路径中止。
/// - **执行 (How)**：暂存缓冲区在任务内分配一次并复用；转发前按实际读取长度
///   拷贝为 `Bytes`，观察者拿到的是独立所有权的数据块。
pub(crate) async fn run(
    core: Arc<SocketCore>,
    epoch: u64,
    mut reader: OwnedReadHalf,
    events: UnboundedSender<(u64, SocketEvent)>,
    buffer_size: usize,
) {
    let mut staging = vec![0u8; buffer_size];
    loop {
        match reader.read(&mut staging).await {
            Ok(0) => {
                tracing::debug!("对端关闭连接");
                core.close_from_pipeline(epoch, SocketEvent::Closed);
                return;
            }
            Ok(n) => {
                let _ = events.send((
                    epoch,
                    SocketEvent::DataReceived {
                        data: Bytes::copy_from_slice(&staging[..n]),
                    },
                ));
            }
            Err(err) => {
                tracing::warn!(
                    code = crate::error::codes::RECV_IO,
                    error = %err,
                    "读路径致命错误，终结连接"
                );
                core.close_from_pipeline(epoch, SocketEvent::Closed);
                return;
            }
        }
    }
}
