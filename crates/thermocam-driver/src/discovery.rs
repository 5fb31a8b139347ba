//! 设备探测
//!
//! 按编号依次打开候选端口，发送握手串，读取一行应答，完全匹配即认定为目标设备。
//! 探测期间使用短超时，结束时无论结果如何都恢复原来的超时（[`TimeoutGuard`]）。

use std::ops::{Deref, DerefMut, RangeInclusive};
use thermocam_protocol::{HANDSHAKE_REQUEST, HANDSHAKE_RESPONSE};
use thermocam_serial::{PortIndex, SerialSettings, Timeouts, Transport};
use tracing::{debug, info, trace, warn};

/// 探测配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// 候选端口编号（升序尝试）
    pub ports: RangeInclusive<PortIndex>,
    /// 探测期间的超时
    pub probe_timeouts: Timeouts,
    /// 握手串（原样写出，`None` 表示只读取）
    pub handshake: Option<String>,
    /// 期望的完整应答行
    pub expected_response: String,
    /// 真实串口的参数（波特率、端口命名）
    pub serial: SerialSettings,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ports: 0..=255,
            probe_timeouts: Timeouts::PROBE,
            handshake: Some(HANDSHAKE_REQUEST.to_string()),
            expected_response: HANDSHAKE_RESPONSE.to_string(),
            serial: SerialSettings::default(),
        }
    }
}

/// 成功打开的端口及其应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedPort {
    pub index: PortIndex,
    pub label: String,
    /// 读到的应答（超时或读写失败时为空）
    pub response: String,
}

/// 探测结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// 是否找到设备（找到时端口保持打开）
    pub found: bool,
    /// 所有成功打开的端口，按编号升序
    pub probed: Vec<ProbedPort>,
}

impl DiscoveryReport {
    /// 匹配的端口
    pub fn matched(&self) -> Option<&ProbedPort> {
        if self.found { self.probed.last() } else { None }
    }
}

/// 作用域内覆盖超时，Drop 时恢复
pub struct TimeoutGuard<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    saved: Timeouts,
}

impl<'a, T: Transport + ?Sized> TimeoutGuard<'a, T> {
    pub fn new(transport: &'a mut T, timeouts: Timeouts) -> Self {
        let saved = transport.timeouts();
        if let Err(e) = transport.set_timeouts(timeouts) {
            warn!("Failed to apply probe timeouts: {}", e);
        }
        Self { transport, saved }
    }
}

impl<T: Transport + ?Sized> Deref for TimeoutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport + ?Sized> DerefMut for TimeoutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport + ?Sized> Drop for TimeoutGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.set_timeouts(self.saved) {
            warn!("Failed to restore serial timeouts: {}", e);
        }
    }
}

/// 探测设备
///
/// 打不开的端口静默跳过；能打开但握手读写失败的端口记为空应答。
/// 找到设备时端口保持打开，否则关闭。
///
/// # Example
///
/// ```
/// use thermocam_driver::{DiscoveryConfig, discover};
/// use thermocam_serial::mock::MockTransport;
///
/// let mut transport = MockTransport::new()
///     .with_port(0, "ttyACM0")
///     .with_reply(2, "ttyACM2", "<INFO:dev=ThermalCamera>\r\n");
/// let report = discover(&mut transport, &DiscoveryConfig::default());
///
/// assert!(report.found);
/// assert_eq!(report.matched().map(|p| p.index), Some(2));
/// ```
pub fn discover<T: Transport + ?Sized>(transport: &mut T, config: &DiscoveryConfig) -> DiscoveryReport {
    let mut port = TimeoutGuard::new(transport, config.probe_timeouts);
    let mut report = DiscoveryReport::default();

    for index in config.ports.clone() {
        port.close();
        if let Err(e) = port.open(index) {
            trace!("Port {} not available: {}", index, e);
            continue;
        }
        let label = port.port_label().unwrap_or_else(|| index.to_string());
        let response = handshake(&mut *port, config.handshake.as_deref()).unwrap_or_else(|e| {
            debug!("Handshake on {} failed: {}", label, e);
            String::new()
        });
        trace!("Port {} answered {:?}", label, response);

        let matched = response == config.expected_response;
        if matched {
            info!("Found thermal camera on {}", label);
        }
        report.probed.push(ProbedPort {
            index,
            label,
            response,
        });
        if matched {
            report.found = true;
            return report;
        }
    }

    port.close();
    warn!(
        "Thermal camera not found, {} port(s) opened: {:?}",
        report.probed.len(),
        report.probed
    );
    report
}

fn handshake<T: Transport + ?Sized>(
    transport: &mut T,
    request: Option<&str>,
) -> Result<String, thermocam_serial::SerialError> {
    if let Some(request) = request {
        transport.write_all(request.as_bytes())?;
    }
    transport.read_line()
}
