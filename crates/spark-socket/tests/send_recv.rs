//! 收发管道契约的集成验证：字节序、对端关闭与逐条发送超时。
//!
//! # 教案式说明
//! - **Why**：发送队列的 FIFO 语义、部分写出续传与“单条超时不拖垮连接”是
//!   本 crate 最核心的行为承诺，必须在真实内核缓冲区的背压下验证；
//! - **How**：以回环连接构造对端，通过控制对端读/不读制造可写与阻塞两种
//!   背压形态；超时用例以 64 MiB 负载确保无法在截止时间内写完；
//! - **What**：断言回调次数与负载内容，失败时打印完整事件序列。

mod support;

use bytes::Bytes;
use spark_socket::{SocketErrorKind, SocketState, TcpSocket};
use std::time::Duration;
use support::{Observed, RecordingObserver};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn connected_pair(observer: &std::sync::Arc<RecordingObserver>) -> (TcpSocket, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("绑定回环监听器");
    let addr = listener.local_addr().expect("读取监听地址");

    let socket = TcpSocket::new();
    socket.set_observer(observer);
    socket.connect("127.0.0.1", &addr.port().to_string(), 5.0);

    let (peer, _) = listener.accept().await.expect("接受连接");
    observer
        .wait_until("建连", |events| {
            events.iter().any(|e| matches!(e, Observed::Connected(..)))
        })
        .await;
    (socket, peer)
}

/// 连接期内的多次发送按调用顺序到达对端，字节序不乱不丢。
#[tokio::test(flavor = "multi_thread")]
async fn sends_arrive_in_call_order() {
    let observer = RecordingObserver::new();
    let (socket, mut peer) = connected_pair(&observer).await;

    for chunk in [&b"alpha"[..], &b"beta"[..], &b"gamma"[..]] {
        socket.send(Bytes::from_static(chunk), 5.0);
    }

    let mut received = vec![0u8; 14];
    tokio::time::timeout(Duration::from_secs(10), peer.read_exact(&mut received))
        .await
        .expect("读取超时")
        .expect("对端读取");
    assert_eq!(&received, b"alphabetagamma");
    assert_eq!(
        observer.count(|e| matches!(e, Observed::SendFailed(..))),
        0,
        "顺序发送不应出现失败：{:?}",
        observer.snapshot()
    );
}

/// 对端写入的数据按字节流顺序转发给观察者。
#[tokio::test(flavor = "multi_thread")]
async fn received_bytes_are_forwarded_in_stream_order() {
    let observer = RecordingObserver::new();
    let (socket, mut peer) = connected_pair(&observer).await;

    peer.write_all(b"hello socket").await.expect("对端写入");
    peer.flush().await.expect("对端冲刷");

    observer
        .wait_until("数据到达", |events| {
            let total: usize = events
                .iter()
                .filter_map(|e| match e {
                    Observed::Data(data) => Some(data.len()),
                    _ => None,
                })
                .sum();
            total >= 12
        })
        .await;

    let joined: Vec<u8> = observer
        .snapshot()
        .iter()
        .filter_map(|e| match e {
            Observed::Data(data) => Some(data.to_vec()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(&joined, b"hello socket");
    assert_eq!(socket.state(), SocketState::Connected);
}

/// 零长读取（对端主动关闭）：恰好一次 `on_closed`，此后再无接收回调。
#[tokio::test(flavor = "multi_thread")]
async fn peer_close_yields_exactly_one_closed() {
    let observer = RecordingObserver::new();
    let (socket, peer) = connected_pair(&observer).await;

    drop(peer);
    observer
        .wait_until("closed 回调", |events| {
            events.iter().any(|e| matches!(e, Observed::Closed))
        })
        .await;

    assert_eq!(socket.state(), SocketState::Closed);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let events = observer.snapshot();
    assert_eq!(
        events.iter().filter(|e| matches!(e, Observed::Closed)).count(),
        1,
        "closed 只应上报一次：{events:?}"
    );
    let closed_at = events
        .iter()
        .position(|e| matches!(e, Observed::Closed))
        .expect("已断言存在");
    assert!(
        events[closed_at..].iter().all(|e| !matches!(e, Observed::Data(_))),
        "closed 之后不得再有接收回调：{events:?}"
    );
}

/// 单条发送超时：恰好一次 `SendTimeout`，连接保持，后续条目继续发送。
///
/// 64 MiB 负载远超回环连接的在途容量，对端不读取时必然无法在 200ms 内写完；
/// 超时后对端开始排空，验证下一条目仍会被尝试并最终到达。
#[tokio::test(flavor = "multi_thread")]
async fn send_timeout_discards_item_but_keeps_queue_running() {
    let observer = RecordingObserver::new();
    let (socket, mut peer) = connected_pair(&observer).await;

    let big = Bytes::from(vec![0x5A; 64 * 1024 * 1024]);
    socket.send(big, 0.2);

    observer
        .wait_until("send timeout 回调", |events| {
            events
                .iter()
                .any(|e| matches!(e, Observed::SendFailed(SocketErrorKind::SendTimeout, _)))
        })
        .await;
    assert_eq!(
        observer.count(|e| matches!(e, Observed::SendFailed(..))),
        1,
        "超时失败只应上报一次：{:?}",
        observer.snapshot().len()
    );
    assert_eq!(socket.state(), SocketState::Connected, "单条超时不应关闭连接");

    socket.send(Bytes::from_static(b"tail"), 10.0);

    // 排空对端直至观察到后续条目的完整负载。
    let drained = tokio::time::timeout(Duration::from_secs(30), async {
        let mut window = [0u8; 4];
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let n = peer.read(&mut chunk).await.expect("对端读取");
            assert!(n > 0, "对端在 tail 到达前读到 EOF");
            if n >= 4 {
                window.copy_from_slice(&chunk[n - 4..n]);
            } else {
                window.rotate_left(n);
                window[4 - n..].copy_from_slice(&chunk[..n]);
            }
            if &window == b"tail" {
                return;
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "后续条目未在超时内到达对端");
}
