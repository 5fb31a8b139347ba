//! 命令发送
//!
//! 构建主机命令负载并放入发送队列，由 IO 线程加上分隔符写出。

use crate::error::DriverError;
use crate::queue::MessageQueue;
use thermocam_protocol::{HostCommand, Servo, ServoPosition, validate_payload};
use tracing::trace;

/// 命令发送器
///
/// 可克隆，所有克隆共享同一个发送队列。
#[derive(Debug, Clone)]
pub struct CommandSender {
    outgoing: MessageQueue<String>,
}

impl CommandSender {
    pub fn new(outgoing: MessageQueue<String>) -> Self {
        Self { outgoing }
    }

    /// 发送类型化命令
    pub fn send(&self, command: HostCommand) -> Result<(), DriverError> {
        self.enqueue(command.payload())
    }

    /// 发送原始负载（不能包含 `<` 或 `>`）
    pub fn send_raw(&self, payload: &str) -> Result<(), DriverError> {
        validate_payload(payload)?;
        self.enqueue(payload.to_string())
    }

    fn enqueue(&self, payload: String) -> Result<(), DriverError> {
        trace!("Queueing <{}>", payload);
        self.outgoing.push(payload)
    }

    /// 开始扫描：`s`
    pub fn start_scan(&self) -> Result<(), DriverError> {
        self.send(HostCommand::StartScan)
    }

    /// 查询设备信息：`i?`
    pub fn query_info(&self) -> Result<(), DriverError> {
        self.send(HostCommand::InfoQuery)
    }

    /// 查询目标温度：`to?`
    pub fn query_object_temperature(&self) -> Result<(), DriverError> {
        self.send(HostCommand::ObjectTemperatureQuery)
    }

    /// 查询环境温度：`ta?`
    pub fn query_ambient_temperature(&self) -> Result<(), DriverError> {
        self.send(HostCommand::AmbientTemperatureQuery)
    }

    /// 设置舵机：`A=<v>` / `B=<v>`
    ///
    /// 超出 `[SERVO_MIN, SERVO_MAX]` 时返回错误，不入队。
    pub fn set_servo(&self, servo: Servo, value: i64) -> Result<(), DriverError> {
        let position = ServoPosition::new(value)?;
        self.send(HostCommand::SetServo { servo, position })
    }

    /// 查询单个舵机：`A?` / `B?`
    pub fn query_servo(&self, servo: Servo) -> Result<(), DriverError> {
        self.send(HostCommand::ServoQuery(servo))
    }

    /// 同时移动两个舵机：`a=<a>,<b>`
    pub fn set_absolute_position(&self, a: i64, b: i64) -> Result<(), DriverError> {
        let a = ServoPosition::new(a)?;
        let b = ServoPosition::new(b)?;
        self.send(HostCommand::SetAbsolutePosition { a, b })
    }

    /// 相对移动两个舵机：`r=<dx>,<dy>`
    ///
    /// 偏移超出 `u16` 时返回错误，不入队。
    pub fn move_relative(&self, dx: i64, dy: i64) -> Result<(), DriverError> {
        self.send(HostCommand::move_relative(dx, dy)?)
    }

    /// 查询两个舵机：`a?`
    pub fn query_absolute_position(&self) -> Result<(), DriverError> {
        self.send(HostCommand::AbsolutePositionQuery)
    }

    /// 待发送的消息数
    pub fn pending(&self) -> usize {
        self.outgoing.len()
    }
}
