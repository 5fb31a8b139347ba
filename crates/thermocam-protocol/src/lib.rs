//! # Thermocam Protocol
//!
//! 热成像扫描仪串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（读数范围、舵机范围、握手字符串）
//! - `framing`: `'<' payload '>'` 帧编解码
//! - `feedback`: 设备 → 主机 消息解析
//! - `control`: 主机 → 设备 命令构建
//!
//! ## 线路格式
//!
//! 每条消息都是 ASCII 文本，以 `<` 开始、`>` 结束，字段用 `:` 分隔：
//!
//! ```text
//! <Scan:3:5:12000>        设备推送一个扫描点
//! <INFO:dev=ThermalCamera> 设备信息应答
//! <A=400>                 主机设置舵机 A
//! ```

pub mod constants;
pub mod control;
pub mod feedback;
pub mod framing;

// 重新导出常用类型
pub use constants::*;
pub use control::{HostCommand, Servo, ServoPosition};
pub use feedback::DeviceMessage;
pub use framing::{FrameDecoder, encode_frame, validate_payload};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧内容不是合法的 UTF-8
    #[error("Frame payload is not valid UTF-8 ({len} bytes dropped)")]
    InvalidUtf8 { len: usize },

    /// 帧长度超过上限仍未遇到结束符
    #[error("Frame exceeded {limit} bytes without a stop delimiter")]
    FrameOverflow { limit: usize },

    /// 参数个数不符
    #[error("Malformed {verb} command: expected {expected} argument(s), got {actual}")]
    ArgumentCount {
        verb: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 参数不是合法整数
    #[error("Malformed {verb} command: invalid integer {value:?}")]
    InvalidInteger { verb: &'static str, value: String },

    /// 负载中包含帧分隔符，无法编码
    #[error("Payload contains a frame delimiter: {0:?}")]
    DelimiterInPayload(String),

    /// 舵机位置超出执行器范围
    #[error("Servo value {value} out of range [{min}, {max}]")]
    ServoOutOfRange { value: i64, min: u16, max: u16 },

    /// 相对移动量不是 16 位无符号数
    #[error("Relative move {value} out of range [0, 65535]")]
    RelativeMoveOutOfRange { value: i64 },

    /// 无效的舵机编号
    #[error("Invalid servo index: {0}")]
    InvalidServo(u8),
}
