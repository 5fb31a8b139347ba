//! 设备 → 主机 消息解析
//!
//! 负载格式为 `VERB:arg1:arg2...`。除 `Scan` 外，固件的应答都只有一个文本参数
//! （`USB_send_cmd(cmd, message)` 输出 `<cmd:message>`）。

use crate::ProtocolError;
use crate::constants::FIELD_SEPARATOR;

/// 设备消息（解析后的强类型表示）
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceMessage {
    /// 扫描点：`Scan:x:y:value`
    ///
    /// 坐标与读数保持有符号宽整型，范围检查由网格负责。
    Scan { x: i64, y: i64, value: i64 },
    /// 设备信息：`INFO:dev=ThermalCamera`
    Info(String),
    /// 目标温度原始读数：`OBJECT:<u16>`
    ObjectTemperature(i64),
    /// 环境温度原始读数：`AMBIENT:<u16>`
    AmbientTemperature(i64),
    /// 两个舵机的当前寄存器值：`ABSPOS:<a>,<b>`
    AbsolutePosition { servo_a: i64, servo_b: i64 },
    /// 单个舵机寄存器值：`OCRA:<u16>`
    ServoPosition(i64),
    /// 固件警告
    Warning(String),
    /// 固件错误
    Error(String),
    /// 固件调试输出
    Debug(String),
    /// 未识别的动词
    Unknown { verb: String, args: Vec<String> },
}

impl DeviceMessage {
    pub const VERB_SCAN: &'static str = "Scan";
    pub const VERB_INFO: &'static str = "INFO";
    pub const VERB_OBJECT: &'static str = "OBJECT";
    pub const VERB_AMBIENT: &'static str = "AMBIENT";
    pub const VERB_ABSPOS: &'static str = "ABSPOS";
    pub const VERB_SERVO: &'static str = "OCRA";
    pub const VERB_WARNING: &'static str = "WARNING";
    pub const VERB_ERROR: &'static str = "ERROR";
    pub const VERB_DEBUG: &'static str = "DEBUG";

    /// 解析一条已去除分隔符的消息
    ///
    /// 未知动词不是错误，返回 [`DeviceMessage::Unknown`]；
    /// 已知动词参数个数或格式不对时返回 [`ProtocolError`]。
    ///
    /// # Example
    ///
    /// ```
    /// use thermocam_protocol::DeviceMessage;
    ///
    /// let msg = DeviceMessage::parse("Scan:3:5:12000").unwrap();
    /// assert_eq!(msg, DeviceMessage::Scan { x: 3, y: 5, value: 12000 });
    /// ```
    pub fn parse(message: &str) -> Result<Self, ProtocolError> {
        let mut tokens = message.split(FIELD_SEPARATOR);
        // split 至少产生一个元素
        let verb = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        match verb {
            Self::VERB_SCAN => {
                let [x, y, value] = args.as_slice() else {
                    return Err(ProtocolError::ArgumentCount {
                        verb: Self::VERB_SCAN,
                        expected: 3,
                        actual: args.len(),
                    });
                };
                Ok(Self::Scan {
                    x: parse_int(Self::VERB_SCAN, x)?,
                    y: parse_int(Self::VERB_SCAN, y)?,
                    value: parse_int(Self::VERB_SCAN, value)?,
                })
            },
            Self::VERB_INFO => Ok(Self::Info(join_text(&args))),
            Self::VERB_OBJECT => Ok(Self::ObjectTemperature(single_int(Self::VERB_OBJECT, &args)?)),
            Self::VERB_AMBIENT => {
                Ok(Self::AmbientTemperature(single_int(Self::VERB_AMBIENT, &args)?))
            },
            Self::VERB_SERVO => Ok(Self::ServoPosition(single_int(Self::VERB_SERVO, &args)?)),
            Self::VERB_ABSPOS => {
                let [pair] = args.as_slice() else {
                    return Err(ProtocolError::ArgumentCount {
                        verb: Self::VERB_ABSPOS,
                        expected: 1,
                        actual: args.len(),
                    });
                };
                let Some((a, b)) = pair.split_once(',') else {
                    return Err(ProtocolError::InvalidInteger {
                        verb: Self::VERB_ABSPOS,
                        value: pair.to_string(),
                    });
                };
                Ok(Self::AbsolutePosition {
                    servo_a: parse_int(Self::VERB_ABSPOS, a)?,
                    servo_b: parse_int(Self::VERB_ABSPOS, b)?,
                })
            },
            Self::VERB_WARNING => Ok(Self::Warning(join_text(&args))),
            Self::VERB_ERROR => Ok(Self::Error(join_text(&args))),
            Self::VERB_DEBUG => Ok(Self::Debug(join_text(&args))),
            _ => Ok(Self::Unknown {
                verb: verb.to_string(),
                args: args.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// 消息动词
    pub fn verb(&self) -> &str {
        match self {
            Self::Scan { .. } => Self::VERB_SCAN,
            Self::Info(_) => Self::VERB_INFO,
            Self::ObjectTemperature(_) => Self::VERB_OBJECT,
            Self::AmbientTemperature(_) => Self::VERB_AMBIENT,
            Self::AbsolutePosition { .. } => Self::VERB_ABSPOS,
            Self::ServoPosition(_) => Self::VERB_SERVO,
            Self::Warning(_) => Self::VERB_WARNING,
            Self::Error(_) => Self::VERB_ERROR,
            Self::Debug(_) => Self::VERB_DEBUG,
            Self::Unknown { verb, .. } => verb.as_str(),
        }
    }
}

fn parse_int(verb: &'static str, token: &str) -> Result<i64, ProtocolError> {
    token.trim().parse::<i64>().map_err(|_| ProtocolError::InvalidInteger {
        verb,
        value: token.to_string(),
    })
}

fn single_int(verb: &'static str, args: &[&str]) -> Result<i64, ProtocolError> {
    match args {
        [value] => parse_int(verb, value),
        _ => Err(ProtocolError::ArgumentCount {
            verb,
            expected: 1,
            actual: args.len(),
        }),
    }
}

// 文本参数里可能本身含有 ':'，原样拼回
fn join_text(args: &[&str]) -> String {
    args.join(":")
}
