//! 命令分发
//!
//! 把解码后的文本消息解析为 [`DeviceMessage`]，扫描点写入网格，其余应答更新设备状态。
//! 任何错误都只记录日志和计数，不会传播到分发循环之外。

use crate::grid::GridStore;
use crate::metrics::DriverMetrics;
use crate::status::StatusStore;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use thermocam_protocol::DeviceMessage;
use tracing::{debug, error, trace, warn};

/// 单条消息的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 扫描点已写入网格
    CellWritten,
    /// 设备状态已更新
    StatusUpdated,
    /// 参数个数或格式错误
    Malformed,
    /// 坐标或读数越界
    OutOfRange,
    /// 未知动词
    UnknownVerb,
}

/// 命令分发器
#[derive(Debug, Clone)]
pub struct Dispatcher {
    grid: Arc<GridStore>,
    status: Arc<StatusStore>,
    metrics: Arc<DriverMetrics>,
}

impl Dispatcher {
    pub fn new(grid: Arc<GridStore>, status: Arc<StatusStore>, metrics: Arc<DriverMetrics>) -> Self {
        Self {
            grid,
            status,
            metrics,
        }
    }

    /// 处理一条消息（不含分隔符）
    pub fn dispatch(&self, message: &str) -> DispatchOutcome {
        self.metrics.commands_dispatched.fetch_add(1, Ordering::Relaxed);
        let outcome = match DeviceMessage::parse(message) {
            Ok(parsed) => self.apply(message, parsed),
            Err(e) => {
                warn!("Dropping malformed command {:?}: {}", message, e);
                DispatchOutcome::Malformed
            },
        };

        let counter = match outcome {
            DispatchOutcome::CellWritten => &self.metrics.cells_written,
            DispatchOutcome::StatusUpdated => &self.metrics.status_updates,
            DispatchOutcome::Malformed => &self.metrics.malformed_commands,
            DispatchOutcome::OutOfRange => &self.metrics.range_errors,
            DispatchOutcome::UnknownVerb => &self.metrics.unknown_verbs,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn apply(&self, raw: &str, message: DeviceMessage) -> DispatchOutcome {
        match message {
            DeviceMessage::Scan { x, y, value } => match self.grid.write(x, y, value) {
                Ok(()) => DispatchOutcome::CellWritten,
                Err(e) => {
                    warn!("Dropping scan point {:?}: {}", raw, e);
                    DispatchOutcome::OutOfRange
                },
            },
            DeviceMessage::Unknown { .. } => {
                warn!("Ignoring unknown command {:?}", raw);
                DispatchOutcome::UnknownVerb
            },
            reply => {
                self.record(reply);
                DispatchOutcome::StatusUpdated
            },
        }
    }

    fn record(&self, reply: DeviceMessage) {
        match reply {
            DeviceMessage::Info(text) => {
                debug!("Device info: {}", text);
                self.status.update(|s| s.info = Some(text.clone()));
            },
            DeviceMessage::ObjectTemperature(raw) => {
                trace!("Object reading: {}", raw);
                self.status.update(|s| s.object_reading = Some(raw));
            },
            DeviceMessage::AmbientTemperature(raw) => {
                trace!("Ambient reading: {}", raw);
                self.status.update(|s| s.ambient_reading = Some(raw));
            },
            DeviceMessage::AbsolutePosition { servo_a, servo_b } => {
                trace!("Servo positions: {}, {}", servo_a, servo_b);
                self.status.update(|s| s.servo_positions = Some((servo_a, servo_b)));
            },
            DeviceMessage::ServoPosition(raw) => {
                trace!("Servo reading: {}", raw);
                self.status.update(|s| s.last_servo_reading = Some(raw));
            },
            DeviceMessage::Warning(text) => {
                warn!("Device warning: {}", text);
                self.status.update(|s| s.last_warning = Some(text.clone()));
            },
            DeviceMessage::Error(text) => {
                error!("Device error: {}", text);
                self.status.update(|s| s.last_error = Some(text.clone()));
            },
            DeviceMessage::Debug(text) => {
                debug!("Device debug: {}", text);
                self.status.update(|s| s.last_debug = Some(text.clone()));
            },
            // 由 apply 处理
            DeviceMessage::Scan { .. } | DeviceMessage::Unknown { .. } => {},
        }
    }
}
