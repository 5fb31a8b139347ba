//! 主机 → 设备 命令构建
//!
//! 所有命令都是短 ASCII 负载，由 IO 线程加上 `<`/`>` 后写出。

use crate::ProtocolError;
use crate::constants::{SERVO_MAX, SERVO_MIN};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 舵机编号
///
/// 舵机 0（`A`）为水平轴，舵机 1（`B`）为垂直轴。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Servo {
    A = 0,
    B = 1,
}

impl Servo {
    /// 从编号创建（0 → A，1 → B）
    pub fn from_index(index: u8) -> Result<Self, ProtocolError> {
        Self::try_from(index).map_err(|_| ProtocolError::InvalidServo(index))
    }

    /// 命令前缀字母
    pub fn letter(self) -> char {
        match self {
            Servo::A => 'A',
            Servo::B => 'B',
        }
    }
}

/// 经过范围检查的舵机位置（比较寄存器值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoPosition(u16);

impl ServoPosition {
    pub const MIN: ServoPosition = ServoPosition(SERVO_MIN);
    pub const MAX: ServoPosition = ServoPosition(SERVO_MAX);

    /// 创建舵机位置，超出 `[SERVO_MIN, SERVO_MAX]` 时返回错误
    ///
    /// 固件对越界值只发警告并忽略，这里在入队前就拒绝。
    pub fn new(value: i64) -> Result<Self, ProtocolError> {
        if !(i64::from(SERVO_MIN)..=i64::from(SERVO_MAX)).contains(&value) {
            return Err(ProtocolError::ServoOutOfRange {
                value,
                min: SERVO_MIN,
                max: SERVO_MAX,
            });
        }
        // 范围检查后必然能放进 u16
        Ok(Self(value as u16))
    }

    /// 寄存器原始值
    pub fn value(self) -> u16 {
        self.0
    }

    /// 量程中点
    pub fn center() -> Self {
        Self((SERVO_MIN + SERVO_MAX) / 2)
    }
}

impl fmt::Display for ServoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 主机命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// 开始扫描：`s`
    StartScan,
    /// 查询设备信息：`i?`
    InfoQuery,
    /// 查询目标温度：`to?`
    ObjectTemperatureQuery,
    /// 查询环境温度：`ta?`
    AmbientTemperatureQuery,
    /// 设置单个舵机：`A=<v>` / `B=<v>`
    SetServo { servo: Servo, position: ServoPosition },
    /// 查询单个舵机：`A?` / `B?`
    ServoQuery(Servo),
    /// 同时设置两个舵机：`a=<a>,<b>`
    SetAbsolutePosition { a: ServoPosition, b: ServoPosition },
    /// 查询两个舵机：`a?`
    AbsolutePositionQuery,
    /// 两个舵机各自加上偏移：`r=<dx>,<dy>`
    ///
    /// 固件把偏移当作 16 位无符号数直接加到当前值上，不做范围检查。
    MoveRelative { dx: u16, dy: u16 },
}

impl HostCommand {
    /// 构造相对移动命令，偏移必须能放进 `u16`
    pub fn move_relative(dx: i64, dy: i64) -> Result<Self, ProtocolError> {
        let offset = |value: i64| {
            u16::try_from(value).map_err(|_| ProtocolError::RelativeMoveOutOfRange { value })
        };
        Ok(HostCommand::MoveRelative {
            dx: offset(dx)?,
            dy: offset(dy)?,
        })
    }

    /// 生成线路负载（不含分隔符）
    ///
    /// # Example
    ///
    /// ```
    /// use thermocam_protocol::{HostCommand, Servo, ServoPosition};
    ///
    /// let cmd = HostCommand::SetServo {
    ///     servo: Servo::B,
    ///     position: ServoPosition::new(400).unwrap(),
    /// };
    /// assert_eq!(cmd.payload(), "B=400");
    /// ```
    pub fn payload(&self) -> String {
        match self {
            HostCommand::StartScan => "s".to_string(),
            HostCommand::InfoQuery => "i?".to_string(),
            HostCommand::ObjectTemperatureQuery => "to?".to_string(),
            HostCommand::AmbientTemperatureQuery => "ta?".to_string(),
            HostCommand::SetServo { servo, position } => format!("{}={}", servo.letter(), position),
            HostCommand::ServoQuery(servo) => format!("{}?", servo.letter()),
            HostCommand::SetAbsolutePosition { a, b } => format!("a={},{}", a, b),
            HostCommand::AbsolutePositionQuery => "a?".to_string(),
            HostCommand::MoveRelative { dx, dy } => format!("r={},{}", dx, dy),
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}
