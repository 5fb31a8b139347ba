//! 驱动层错误类型定义

use crate::discovery::ProbedPort;
use crate::grid::GridError;
use thermocam_protocol::ProtocolError;
use thermocam_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 协议错误（命令参数不合法等）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 网格错误
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// 有界队列已满（`RejectNew` 策略）
    #[error("Queue full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// 队列已关闭（驱动正在停止）
    #[error("Queue closed")]
    ChannelClosed,

    /// 探测完所有端口仍未找到设备
    #[error("Device not found ({} port(s) answered)", probed.len())]
    DeviceNotFound { probed: Vec<ProbedPort> },

    /// 后台线程启动失败
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 等待设备应答超时
    #[error("Operation timeout")]
    Timeout,
}
