#![doc = r#"
# spark-socket

## 设计动机（Why）
- **定位**：该 crate 提供基于 Tokio 的客户端异步 TCP 套接字抽象：打开连接、
  非阻塞收发字节缓冲区，并通过观察者接口上报生命周期事件。
- **架构角色**：面向必须把网络 IO 移出主执行上下文、又希望保留
  “打开 → 连接 → 收发 → 关闭”顺序调用语义的应用代码。
- **设计理念**：强调“串行管道”与“代际隔离”——发送与接收各占一条串行任务，
  回调经专用分发任务按产生顺序投递；主动关闭通过代际计数使所有在途结果
  失效，保证零回调拆除。

## 核心契约（What）
- **输入条件**：调用方必须在 Tokio 运行时中使用本实现，并在 `connect` 前注册
  [`SocketObserver`]；
- **输出保障**：每个异步失败恰好产生一次携带 [`SocketError`] 的回调；回调
  投递顺序与事件产生顺序一致；`close()` 不触发任何回调；
- **前置约束**：一个 [`TcpSocket`] 实例只建模一条连接的一次生命周期，不做
  连接池或多目的地复用；不内置分帧/协议解析，观察者收到的是原始字节块。

## 实现策略（How）
- **执行框架**：完全依赖 Tokio 的 `TcpStream` 与任务模型：连接驱动、发送
  管道、接收管道、事件分发各为一个 `tokio::spawn` 任务；
- **状态治理**：[`SocketState`] 跃迁表是三条路径共同查询的唯一事实来源，
  非法操作被拒绝且不产生副作用；
- **超时治理**：连接与单条发送的截止时间分别由 `tokio::time::timeout` /
  `timeout_at` 守护，守护者与操作同属一个任务，完成与超时互斥成立。

## 风险与考量（Trade-offs）
- **背压**：发送队列无界，调用方应依据 `on_writable` 自行节流；
- **回调时序**：观察者回调串行执行，回调内长阻塞会推迟后续事件投递，但
  不会阻塞 IO 管道本身；
- **关闭竞争**：`close()` 与在途连接/收发并发时结果按代际丢弃，在极端时序
  下已进入投递流程的单次回调可能先于 `close()` 完成，属契约允许的交错。
"#]

mod config;
mod error;
mod event;
mod observer;
mod pipeline;
mod socket;
mod state;

pub use config::{DEFAULT_RECV_BUFFER_SIZE, SocketConfig};
pub use error::{SocketError, SocketErrorKind, codes};
pub use observer::SocketObserver;
pub use socket::TcpSocket;
pub use state::SocketState;
