//! 协议常量定义
//!
//! 数值来自 MLX90614 传感器手册与扫描仪固件。

/// 帧起始符
pub const START_DELIMITER: u8 = b'<';

/// 帧结束符
pub const STOP_DELIMITER: u8 = b'>';

/// 字段分隔符
pub const FIELD_SEPARATOR: char = ':';

/// 传感器最小读数（原始单位，约 -70.01 °C）
pub const MIN_READING: i32 = 0x27AD;

/// 传感器最大读数（原始单位，约 382.19 °C）
pub const MAX_READING: i32 = 0x7FFF;

/// 网格清空后的占位值，不属于任何合法读数
pub const SENTINEL: i32 = 0;

/// 舵机比较寄存器最小值（最小角度）
pub const SERVO_MIN: u16 = 175;

/// 舵机比较寄存器最大值（最大角度）
pub const SERVO_MAX: u16 = 608;

/// 固件默认扫描分辨率（64 × 64）
pub const DEFAULT_GRID_SIZE: usize = 64;

/// 帧解码器默认的最大负载长度（字节）
///
/// 固件接收缓冲区为 32 字节，设备发出的最长应答也远小于该值。
pub const DEFAULT_MAX_FRAME_LEN: usize = 256;

/// 设备识别字符串（`INFO` 应答的参数）
pub const DEVICE_IDENT: &str = "dev=ThermalCamera";

/// 设备探测时发送的握手请求（已经带帧分隔符）
pub const HANDSHAKE_REQUEST: &str = "<i?>";

/// 设备探测时期望的原始行应答（固件以 `\r\n` 结束每条输出）
pub const HANDSHAKE_RESPONSE: &str = "<INFO:dev=ThermalCamera>\r\n";

/// 原始读数转换为摄氏度
///
/// `celsius = reading / 50 - 273.15`
///
/// # Example
///
/// ```
/// use thermocam_protocol::reading_to_celsius;
///
/// let c = reading_to_celsius(15000);
/// assert!((c - 26.85).abs() < 1e-9);
/// ```
#[inline]
pub fn reading_to_celsius(reading: i32) -> f64 {
    f64::from(reading) / 50.0 - 273.15
}

/// 判断读数是否在传感器量程内
#[inline]
pub fn is_valid_reading(reading: i64) -> bool {
    (i64::from(MIN_READING)..=i64::from(MAX_READING)).contains(&reading)
}
