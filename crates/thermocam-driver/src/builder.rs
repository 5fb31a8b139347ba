//! Builder 模式实现
//!
//! 提供链式构造 `ThermoCam` 实例的便捷方式。

use crate::camera::{CameraOptions, ThermoCam};
use crate::discovery::{DiscoveryConfig, discover};
use crate::error::DriverError;
use crate::grid::FillPattern;
use crate::pipeline::PipelineConfig;
use crate::queue::QueuePolicy;
use std::ops::RangeInclusive;
use thermocam_serial::{PortIndex, PortNaming, SerialPortTransport, Timeouts, Transport};
use tracing::info;

/// ThermoCam Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use thermocam_driver::{PipelineConfig, ThermoCamBuilder};
///
/// // 探测所有端口
/// let camera = ThermoCamBuilder::new().connect().unwrap();
///
/// // 指定端口，缩短轮询间隔
/// let camera = ThermoCamBuilder::new()
///     .port_name("/dev/ttyUSB0")
///     .pipeline_config(PipelineConfig {
///         poll_interval_ms: 5,
///         ..Default::default()
///     })
///     .connect()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ThermoCamBuilder {
    options: CameraOptions,
    discovery: DiscoveryConfig,
    /// 显式端口名（设置后跳过探测）
    port_name: Option<String>,
}

impl ThermoCamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 网格边长（默认 64）
    pub fn grid_size(mut self, size: usize) -> Self {
        self.options.grid_size = size;
        self
    }

    /// 初始填充方式（默认哨兵值）
    pub fn fill(mut self, fill: FillPattern) -> Self {
        self.options.fill = fill;
        self
    }

    /// Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.options.pipeline = config;
        self
    }

    /// 接收队列策略（默认无界）
    pub fn incoming_queue(mut self, policy: QueuePolicy) -> Self {
        self.options.incoming = policy;
        self
    }

    /// 发送队列策略（默认无界）
    pub fn outgoing_queue(mut self, policy: QueuePolicy) -> Self {
        self.options.outgoing = policy;
        self
    }

    /// 完整的探测配置
    pub fn discovery_config(mut self, config: DiscoveryConfig) -> Self {
        self.discovery = config;
        self
    }

    /// 探测的端口范围（默认 `0..=255`）
    pub fn probe_range(mut self, ports: RangeInclusive<PortIndex>) -> Self {
        self.discovery.ports = ports;
        self
    }

    /// 握手串和期望应答
    pub fn handshake(mut self, request: Option<String>, expected_response: impl Into<String>) -> Self {
        self.discovery.handshake = request;
        self.discovery.expected_response = expected_response.into();
        self
    }

    /// 波特率（默认 9600）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.discovery.serial.baud_rate = baud_rate;
        self
    }

    /// 端口名模板，`{n}` 替换为端口编号
    pub fn port_template(mut self, template: impl Into<String>) -> Self {
        self.discovery.serial.naming = PortNaming::Template(template.into());
        self
    }

    /// 直接使用指定端口，不做探测
    pub fn port_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some(name.into());
        self
    }

    /// 当前探测配置
    pub fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// 用已经打开的传输启动
    pub fn build_with_transport<T>(self, transport: T) -> Result<ThermoCam, DriverError>
    where
        T: Transport + Send + 'static,
    {
        ThermoCam::new(transport, self.options)
    }

    /// 在给定传输上探测设备，找到后启动
    pub fn discover_with<T>(self, mut transport: T) -> Result<ThermoCam, DriverError>
    where
        T: Transport + Send + 'static,
    {
        let report = discover(&mut transport, &self.discovery);
        if !report.found {
            return Err(DriverError::DeviceNotFound {
                probed: report.probed,
            });
        }
        self.build_with_transport(transport)
    }

    /// 打开真实串口并启动
    ///
    /// 设置了 `port_name` 时直接打开该端口，否则按探测配置逐个尝试。
    pub fn connect(self) -> Result<ThermoCam, DriverError> {
        let mut transport = SerialPortTransport::new(self.discovery.serial.clone());
        match self.port_name.clone() {
            Some(name) => {
                transport.set_timeouts(Timeouts::default())?;
                transport.open_named(&name, 0)?;
                info!("Opened {} without discovery", name);
                self.build_with_transport(transport)
            },
            None => self.discover_with(transport),
        }
    }
}
