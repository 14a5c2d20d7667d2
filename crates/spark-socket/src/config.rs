//! 套接字实例级配置。

use std::time::Duration;

/// 接收暂存缓冲区的默认容量（32 KiB）。
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1 << 15;

/// 每实例配置项。
///
/// # 教案式说明
/// - **意图 (Why)**：接收管道以固定容量的暂存缓冲区按轮次排空套接字，容量决定
///   单次 `on_data_received` 的最大块长，应允许按场景调整；
/// - **契约 (What)**：`recv_buffer_size` 必须大于零，默认 32 KiB；配置在构造时
///   一次性生效，连接期间不可变。
#[derive(Clone, Debug)]
pub struct SocketConfig {
    /// 接收暂存缓冲区容量（字节）。
    pub recv_buffer_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

/// 将调用方传入的秒数转换为超时预算；负值或非有限值表示“无截止时间”。
pub(crate) fn timeout_budget(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_RECV_BUFFER_SIZE, SocketConfig, timeout_budget};
    use std::time::Duration;

    #[test]
    fn default_buffer_matches_legacy_size() {
        assert_eq!(SocketConfig::default().recv_buffer_size, DEFAULT_RECV_BUFFER_SIZE);
        assert_eq!(DEFAULT_RECV_BUFFER_SIZE, 32 * 1024);
    }

    #[test]
    fn negative_timeout_means_no_deadline() {
        assert_eq!(timeout_budget(-1.0), None);
        assert_eq!(timeout_budget(f64::NAN), None);
        assert_eq!(timeout_budget(f64::INFINITY), None);
    }

    #[test]
    fn zero_timeout_is_an_immediate_deadline() {
        assert_eq!(timeout_budget(0.0), Some(Duration::ZERO));
        assert_eq!(timeout_budget(1.5), Some(Duration::from_millis(1500)));
    }
}
