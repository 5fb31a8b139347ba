//! 管道性能指标
//!
//! 原子计数器，IO 线程和分发线程更新，任何线程都可以读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 管道实时指标
///
/// # 使用示例
///
/// ```rust
/// use thermocam_driver::DriverMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = DriverMetrics::new();
/// metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.frames_decoded, 1);
/// ```
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// 从串口读到的字节数
    pub bytes_read: AtomicU64,
    /// 解码出的完整帧数
    pub frames_decoded: AtomicU64,
    /// 非 UTF-8 帧（已丢弃）
    pub decode_errors: AtomicU64,
    /// 超长帧（已丢弃）
    pub frame_overflows: AtomicU64,
    /// 串口读失败次数
    pub read_errors: AtomicU64,
    /// 接收队列满导致丢弃的消息数
    pub incoming_dropped: AtomicU64,

    /// 成功写出的消息数
    pub messages_written: AtomicU64,
    /// 写失败次数（消息保留，下个周期重试）
    pub write_failures: AtomicU64,

    /// 分发线程处理的消息总数
    pub commands_dispatched: AtomicU64,
    /// 成功写入网格的扫描点
    pub cells_written: AtomicU64,
    /// 更新设备状态的应答数
    pub status_updates: AtomicU64,
    /// 参数个数或格式错误的命令
    pub malformed_commands: AtomicU64,
    /// 坐标或读数越界的扫描点
    pub range_errors: AtomicU64,
    /// 未知动词
    pub unknown_verbs: AtomicU64,
}

impl DriverMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有计数器的当前值
    ///
    /// 各计数器分别读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frame_overflows: self.frame_overflows.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            incoming_dropped: self.incoming_dropped.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            cells_written: self.cells_written.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            malformed_commands: self.malformed_commands.load(Ordering::Relaxed),
            range_errors: self.range_errors.load(Ordering::Relaxed),
            unknown_verbs: self.unknown_verbs.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.bytes_read,
            &self.frames_decoded,
            &self.decode_errors,
            &self.frame_overflows,
            &self.read_errors,
            &self.incoming_dropped,
            &self.messages_written,
            &self.write_failures,
            &self.commands_dispatched,
            &self.cells_written,
            &self.status_updates,
            &self.malformed_commands,
            &self.range_errors,
            &self.unknown_verbs,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub frames_decoded: u64,
    pub decode_errors: u64,
    pub frame_overflows: u64,
    pub read_errors: u64,
    pub incoming_dropped: u64,
    pub messages_written: u64,
    pub write_failures: u64,
    pub commands_dispatched: u64,
    pub cells_written: u64,
    pub status_updates: u64,
    pub malformed_commands: u64,
    pub range_errors: u64,
    pub unknown_verbs: u64,
}

impl MetricsSnapshot {
    /// 被丢弃的帧和命令总数
    pub fn rejected_total(&self) -> u64 {
        self.decode_errors
            + self.frame_overflows
            + self.incoming_dropped
            + self.malformed_commands
            + self.range_errors
            + self.unknown_verbs
    }

    /// 有效扫描点占已分发消息的比例（百分比）
    ///
    /// `commands_dispatched` 为 0 时返回 0.0。
    pub fn scan_ratio(&self) -> f64 {
        if self.commands_dispatched == 0 {
            return 0.0;
        }
        (self.cells_written as f64 / self.commands_dispatched as f64) * 100.0
    }
}
