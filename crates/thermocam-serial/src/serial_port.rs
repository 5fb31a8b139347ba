//! 基于 `serialport` crate 的真实串口实现

use crate::{PortIndex, SerialDeviceError, SerialDeviceErrorKind, SerialError, Timeouts, Transport};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Instant;
use tracing::{debug, trace};

/// `read_line` 的单行上限，防止设备持续输出无换行数据
const MAX_LINE_LEN: usize = 1024;

/// 端口编号 → 端口名称的映射方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortNaming {
    /// 平台默认：Windows 为 `COM{n+1}`，其他平台为 `/dev/ttyACM{n}`
    Platform,
    /// 自定义模板，`{n}` 会被替换为端口编号，例如 `/dev/ttyUSB{n}`
    Template(String),
}

impl PortNaming {
    /// 计算端口名称
    pub fn name_for(&self, index: PortIndex) -> String {
        match self {
            PortNaming::Platform => {
                if cfg!(windows) {
                    format!("COM{}", u32::from(index) + 1)
                } else {
                    format!("/dev/ttyACM{}", index)
                }
            },
            PortNaming::Template(template) => template.replace("{n}", &index.to_string()),
        }
    }
}

impl Default for PortNaming {
    fn default() -> Self {
        PortNaming::Platform
    }
}

/// 串口参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// 波特率（USB CDC 虚拟串口会忽略，但部分平台要求设置）
    pub baud_rate: u32,
    /// 端口命名方式
    pub naming: PortNaming,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            naming: PortNaming::Platform,
        }
    }
}

/// 真实串口传输
///
/// `serialport` 只有一个超时值，读写共用；这里取两者中较大的一个。
/// IO 线程只读取 `bytes_to_read()` 报告的字节数，因此读操作不会真正阻塞。
pub struct SerialPortTransport {
    settings: SerialSettings,
    timeouts: Timeouts,
    port: Option<Box<dyn SerialPort>>,
    current: Option<(PortIndex, String)>,
}

impl SerialPortTransport {
    /// 创建未打开的传输
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            timeouts: Timeouts::default(),
            port: None,
            current: None,
        }
    }

    /// 按名称直接打开（跳过编号映射，用于配置文件中写死的端口）
    pub fn open_named(&mut self, name: &str, index: PortIndex) -> Result<(), SerialError> {
        self.close();
        let port = serialport::new(name, self.settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.port_timeout())
            .open()?;
        debug!("Opened serial port {} at {} baud", name, self.settings.baud_rate);
        self.port = Some(port);
        self.current = Some((index, name.to_string()));
        Ok(())
    }

    /// 串口设置
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn port_timeout(&self) -> std::time::Duration {
        self.timeouts.read.max(self.timeouts.write)
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, SerialError> {
        self.port.as_mut().ok_or(SerialError::NotOpen)
    }
}

impl Transport for SerialPortTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self, index: PortIndex) -> Result<(), SerialError> {
        let name = self.settings.naming.name_for(index);
        self.open_named(&name, index)
    }

    fn close(&mut self) {
        if let Some((_, name)) = self.current.take() {
            trace!("Closing serial port {}", name);
        }
        // Drop 即关闭
        self.port = None;
    }

    fn port_index(&self) -> Option<PortIndex> {
        self.current.as_ref().map(|(index, _)| *index)
    }

    fn port_label(&self) -> Option<String> {
        self.current.as_ref().map(|(_, name)| name.clone())
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), SerialError> {
        self.timeouts = timeouts;
        let timeout = self.port_timeout();
        if let Some(port) = self.port.as_mut() {
            port.set_timeout(timeout)?;
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        let port = self.port_mut()?;
        Ok(port.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let available = self.bytes_available()?;
        let n = available.min(buf.len());
        if n == 0 {
            return Ok(0);
        }
        let port = self.port_mut()?;
        match port.read(&mut buf[..n]) {
            Ok(read) => Ok(read),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let port = self.port_mut()?;
        let result = port.write_all(bytes).and_then(|_| port.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(SerialError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn read_line(&mut self) -> Result<String, SerialError> {
        let deadline = Instant::now() + self.timeouts.read;
        let port = self.port_mut()?;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while line.len() < MAX_LINE_LEN {
            match port.read(&mut byte) {
                Ok(0) => {},
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                },
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        // 非 UTF-8 字节不可能是期望的应答，按替换字符保留用于诊断
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

/// 列出系统识别到的串口名称（诊断用）
pub fn list_system_ports() -> Result<Vec<String>, SerialError> {
    let ports = serialport::available_ports().map_err(|e| {
        SerialError::Device(SerialDeviceError::new(
            SerialDeviceErrorKind::Backend,
            e.description,
        ))
    })?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
