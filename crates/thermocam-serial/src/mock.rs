//! Mock 传输（无硬件依赖）
//!
//! 用脚本描述一组虚拟端口：哪些可以打开、探测时应答什么、读写何时失败。
//! `MockTransport` 可以克隆，克隆体共享同一份状态，测试线程持有一个克隆，
//! 把另一个交给 IO 线程，即可注入数据并检查写出的字节。
//!
//! ```
//! use thermocam_serial::Transport;
//! use thermocam_serial::mock::MockTransport;
//!
//! let mock = MockTransport::connected();
//! let mut io_side = mock.clone();
//! mock.inject(b"<Scan:0:0:12000>");
//!
//! let mut buf = [0u8; 64];
//! let n = io_side.read_available(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"<Scan:0:0:12000>");
//! ```

use crate::{PortIndex, SerialDeviceError, SerialDeviceErrorKind, SerialError, Timeouts, Transport};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// 单个虚拟端口
#[derive(Debug, Clone, Default)]
struct MockPort {
    label: String,
    /// 探测时 `read_line` 返回的内容（`None` 表示超时，返回空串）
    reply: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    ports: BTreeMap<PortIndex, MockPort>,
    open: Option<PortIndex>,
    timeouts: Timeouts,
    rx: VecDeque<u8>,
    written: Vec<u8>,
    /// 每个端口收到的写入（探测记录）
    written_per_port: BTreeMap<PortIndex, Vec<u8>>,
    open_attempts: Vec<PortIndex>,
    fail_writes: usize,
    fail_reads: usize,
    write_attempts: usize,
    timeout_history: Vec<Timeouts>,
}

/// 脚本化的内存传输
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// 没有任何可打开端口的传输
    pub fn new() -> Self {
        Self::default()
    }

    /// 端口 0 存在且已经打开（用于 IO 循环测试）
    pub fn connected() -> Self {
        let mock = Self::new().with_port(0, "mock0");
        mock.state.lock().open = Some(0);
        mock
    }

    /// 添加一个可打开、探测时不应答的端口
    pub fn with_port(self, index: PortIndex, label: impl Into<String>) -> Self {
        self.state.lock().ports.insert(
            index,
            MockPort {
                label: label.into(),
                reply: None,
            },
        );
        self
    }

    /// 添加一个可打开、探测时应答 `reply` 的端口
    pub fn with_reply(self, index: PortIndex, label: impl Into<String>, reply: impl Into<String>) -> Self {
        self.state.lock().ports.insert(
            index,
            MockPort {
                label: label.into(),
                reply: Some(reply.into()),
            },
        );
        self
    }

    /// 注入待读取的字节（模拟设备发送）
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    /// 尚未被读取的字节数
    pub fn pending_rx(&self) -> usize {
        self.state.lock().rx.len()
    }

    /// 让接下来的 `count` 次写入失败
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }

    /// 让接下来的 `count` 次读取失败
    pub fn fail_next_reads(&self, count: usize) {
        self.state.lock().fail_reads = count;
    }

    /// 模拟设备断开：关闭当前端口
    pub fn disconnect(&self) {
        self.state.lock().open = None;
    }

    /// 模拟重新连接（打开端口 0 或指定端口）
    pub fn reconnect(&self, index: PortIndex) {
        self.state.lock().open = Some(index);
    }

    /// IO 方向写出的全部字节
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// 写出的字节按 UTF-8 解释
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().written).into_owned()
    }

    /// 写入尝试次数（包括失败的）
    pub fn write_attempts(&self) -> usize {
        self.state.lock().write_attempts
    }

    /// 某个端口在探测中收到的字节
    pub fn written_to(&self, index: PortIndex) -> Vec<u8> {
        self.state.lock().written_per_port.get(&index).cloned().unwrap_or_default()
    }

    /// 按顺序记录的 `open` 尝试
    pub fn open_attempts(&self) -> Vec<PortIndex> {
        self.state.lock().open_attempts.clone()
    }

    /// 每次 `set_timeouts` 的参数
    pub fn timeout_history(&self) -> Vec<Timeouts> {
        self.state.lock().timeout_history.clone()
    }
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    fn open(&mut self, index: PortIndex) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        state.open_attempts.push(index);
        if state.open.is_some() {
            return Err(SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::Busy,
                "a port is already open",
            )));
        }
        if !state.ports.contains_key(&index) {
            return Err(SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::NotFound,
                format!("mock port {} does not exist", index),
            )));
        }
        state.open = Some(index);
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().open = None;
    }

    fn port_index(&self) -> Option<PortIndex> {
        self.state.lock().open
    }

    fn port_label(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .open
            .and_then(|index| state.ports.get(&index))
            .map(|port| port.label.clone())
    }

    fn timeouts(&self) -> Timeouts {
        self.state.lock().timeouts
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        state.timeouts = timeouts;
        state.timeout_history.push(timeouts);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, SerialError> {
        let state = self.state.lock();
        if state.open.is_none() {
            return Err(SerialError::NotOpen);
        }
        Ok(state.rx.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut state = self.state.lock();
        if state.open.is_none() {
            return Err(SerialError::NotOpen);
        }
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(SerialError::Io(std::io::Error::other("injected read failure")));
        }
        let n = state.rx.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        let Some(index) = state.open else {
            return Err(SerialError::NotOpen);
        };
        state.write_attempts += 1;
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(SerialError::Timeout);
        }
        state.written.extend_from_slice(bytes);
        state.written_per_port.entry(index).or_default().extend_from_slice(bytes);
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, SerialError> {
        let state = self.state.lock();
        let Some(index) = state.open else {
            return Err(SerialError::NotOpen);
        };
        Ok(state
            .ports
            .get(&index)
            .and_then(|port| port.reply.clone())
            .unwrap_or_default())
    }
}
