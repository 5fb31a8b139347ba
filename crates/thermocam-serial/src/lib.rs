//! # Thermocam Serial Transport Layer
//!
//! 串口硬件抽象层，为驱动层提供统一的字节流接口。
//!
//! - [`Transport`]: 驱动层唯一依赖的 trait（IO 线程独占）
//! - [`SerialPortTransport`]: 基于 `serialport` crate 的真实实现
//! - [`mock::MockTransport`]: 脚本化的内存实现（`mock` feature）

use std::time::Duration;
use thiserror::Error;

pub mod serial_port;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use serial_port::{PortNaming, SerialPortTransport, SerialSettings, list_system_ports};

/// 端口编号（探测时按编号顺序尝试）
pub type PortIndex = u16;

/// 串口层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Operation timeout")]
    Timeout,
    #[error("Port not open")]
    NotOpen,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    InvalidConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 设备已不存在或无权限，重试无意义
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NoDevice
                | SerialDeviceErrorKind::AccessDenied
                | SerialDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<serialport::Error> for SerialDeviceError {
    fn from(err: serialport::Error) -> Self {
        let kind = match err.kind() {
            serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::InvalidConfig,
            serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                SerialDeviceErrorKind::NotFound
            },
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                SerialDeviceErrorKind::AccessDenied
            },
            serialport::ErrorKind::Io(std::io::ErrorKind::ResourceBusy) => {
                SerialDeviceErrorKind::Busy
            },
            serialport::ErrorKind::Io(_) => SerialDeviceErrorKind::Backend,
            serialport::ErrorKind::Unknown => SerialDeviceErrorKind::Unknown,
        };
        Self::new(kind, err.description)
    }
}

impl From<serialport::Error> for SerialError {
    fn from(err: serialport::Error) -> Self {
        SerialError::Device(err.into())
    }
}

/// 读写超时配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// 读超时（`read_line` 的总等待时间）
    pub read: Duration,
    /// 写超时
    pub write: Duration,
}

impl Timeouts {
    /// 设备探测时使用的短超时（100ms）
    pub const PROBE: Timeouts = Timeouts {
        read: Duration::from_millis(100),
        write: Duration::from_millis(100),
    };

    pub const fn new(read: Duration, write: Duration) -> Self {
        Self { read, write }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(10),
            write: Duration::from_millis(100),
        }
    }
}

/// 字节流传输接口
///
/// 由 IO 线程独占（`&mut self`），其他组件不直接访问。
/// `read_available` 与 `bytes_available` 都不能阻塞；
/// `read_line` 仅在设备探测期间使用，受读超时约束。
pub trait Transport {
    /// 当前是否有打开的端口
    fn is_open(&self) -> bool;

    /// 打开指定编号的端口（已有连接需先 `close`）
    fn open(&mut self, index: PortIndex) -> Result<(), SerialError>;

    /// 关闭当前端口（未打开时为空操作）
    fn close(&mut self);

    /// 当前端口编号
    fn port_index(&self) -> Option<PortIndex>;

    /// 当前端口的可读名称（如 `/dev/ttyACM0`、`COM3`）
    fn port_label(&self) -> Option<String>;

    /// 当前超时配置
    fn timeouts(&self) -> Timeouts;

    /// 修改超时配置（未打开时保存，打开端口时生效）
    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), SerialError>;

    /// 已到达、可立即读取的字节数
    fn bytes_available(&mut self) -> Result<usize, SerialError>;

    /// 读取已到达的字节（最多 `buf.len()`），没有数据时返回 `Ok(0)`
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 写出全部字节
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 读取一行（包含结尾 `\n`），超时时返回已读到的部分（可能为空）
    fn read_line(&mut self) -> Result<String, SerialError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn open(&mut self, index: PortIndex) -> Result<(), SerialError> {
        (**self).open(index)
    }
    fn close(&mut self) {
        (**self).close()
    }
    fn port_index(&self) -> Option<PortIndex> {
        (**self).port_index()
    }
    fn port_label(&self) -> Option<String> {
        (**self).port_label()
    }
    fn timeouts(&self) -> Timeouts {
        (**self).timeouts()
    }
    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), SerialError> {
        (**self).set_timeouts(timeouts)
    }
    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        (**self).bytes_available()
    }
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read_available(buf)
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        (**self).write_all(bytes)
    }
    fn read_line(&mut self) -> Result<String, SerialError> {
        (**self).read_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_fatality() {
        assert!(SerialDeviceError::new(SerialDeviceErrorKind::NoDevice, "gone").is_fatal());
        assert!(!SerialDeviceError::new(SerialDeviceErrorKind::Busy, "busy").is_fatal());
        assert!(!SerialDeviceError::from("whatever").is_fatal());
    }

    #[test]
    fn test_from_serialport_error() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged");
        let dev: SerialDeviceError = err.into();
        assert_eq!(dev.kind, SerialDeviceErrorKind::NoDevice);
        assert_eq!(dev.message, "unplugged");

        let err = serialport::Error::new(
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            "denied",
        );
        let serial: SerialError = err.into();
        assert!(matches!(
            serial,
            SerialError::Device(SerialDeviceError {
                kind: SerialDeviceErrorKind::AccessDenied,
                ..
            })
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(SerialError::NotOpen.to_string(), "Port not open");
        assert_eq!(SerialError::Timeout.to_string(), "Operation timeout");
        let dev = SerialError::Device(SerialDeviceError::new(SerialDeviceErrorKind::Busy, "x"));
        assert_eq!(dev.to_string(), "Device Error: Busy: x");
    }

    #[test]
    fn test_probe_timeouts() {
        assert_eq!(Timeouts::PROBE.read, Duration::from_millis(100));
        assert_eq!(Timeouts::PROBE.write, Duration::from_millis(100));
    }
}
