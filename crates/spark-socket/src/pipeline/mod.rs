//! # pipeline 模块说明
//!
//! ## 角色定位（Why）
//! - 承载三类后台任务：连接驱动、发送管道与接收管道，对应“两条独立串行队列 +
//!   一次性连接任务”的执行模型；
//! - 每个任务都携带其所属生命周期的代际标记，完成时先核对代际再推进状态或
//!   入队事件，保证迟到结果不会污染新的生命周期。

pub(crate) mod recv;
pub(crate) mod send;

use crate::error::SocketError;
use crate::socket::SocketCore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// 连接驱动任务：解析端口、发起非阻塞连接并施加可选截止时间。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - `port` 为十进制端口字符串，解析失败视作单一的连接失败结果（地址解析
///     属于外部协作方，本核心不内置服务名查询）；
///   - `budget` 为 `None` 时连接在后台无限期进行；
///   - 无论成败，结果统一交给 [`SocketCore::finish_connect`] 定夺——若期间
///     套接字已被关闭或重连，结果被静默丢弃。
/// - **执行 (How)**：以 `tokio::time::timeout` 组合连接 Future 与截止时间，
///   二者互斥完成，天然满足“超时与成功不会双双上报”的约束。
pub(crate) async fn drive_connect(
    core: Arc<SocketCore>,
    epoch: u64,
    host: String,
    port: String,
    budget: Option<Duration>,
) {
    let outcome = establish(&host, &port, budget).await;
    SocketCore::finish_connect(&core, epoch, outcome);
}

async fn establish(
    host: &str,
    port: &str,
    budget: Option<Duration>,
) -> Result<(TcpStream, SocketAddr), SocketError> {
    let port: u16 = port
        .parse()
        .map_err(|_| SocketError::connect_rejected(format!("invalid port `{port}`")))?;

    let stream = match budget {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SocketError::connect_timeout(limit))?
            .map_err(SocketError::connect_io)?,
        None => TcpStream::connect((host, port))
            .await
            .map_err(SocketError::connect_io)?,
    };

    let peer = stream.peer_addr().map_err(SocketError::connect_io)?;
    Ok((stream, peer))
}
