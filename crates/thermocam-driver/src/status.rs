//! 设备状态
//!
//! 非扫描应答（`INFO`、`OBJECT`、`AMBIENT` 等）更新这里。
//! 只有分发线程写入，宿主线程通过 `ArcSwap` 无锁读取。

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Instant;
use thermocam_protocol::reading_to_celsius;

/// 设备上报的最新状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    /// 设备标识（`INFO` 应答）
    pub info: Option<String>,
    /// 目标温度原始读数（`OBJECT`）
    pub object_reading: Option<i64>,
    /// 环境温度原始读数（`AMBIENT`）
    pub ambient_reading: Option<i64>,
    /// 两个舵机的寄存器值（`ABSPOS`）
    pub servo_positions: Option<(i64, i64)>,
    /// 单个舵机查询的寄存器值（`OCRA`）
    pub last_servo_reading: Option<i64>,
    pub last_warning: Option<String>,
    pub last_error: Option<String>,
    pub last_debug: Option<String>,
    /// 最近一次更新时间
    pub updated_at: Option<Instant>,
}

impl DeviceStatus {
    /// 目标温度（摄氏度）
    pub fn object_celsius(&self) -> Option<f64> {
        self.object_reading.and_then(celsius)
    }

    /// 环境温度（摄氏度）
    pub fn ambient_celsius(&self) -> Option<f64> {
        self.ambient_reading.and_then(celsius)
    }
}

fn celsius(reading: i64) -> Option<f64> {
    i32::try_from(reading).ok().map(reading_to_celsius)
}

/// 状态存储
#[derive(Debug, Default)]
pub struct StatusStore {
    inner: ArcSwap<DeviceStatus>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub fn load(&self) -> Arc<DeviceStatus> {
        self.inner.load_full()
    }

    /// 修改状态（复制 → 修改 → 替换）
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&mut DeviceStatus),
    {
        self.inner.rcu(|current| {
            let mut next = DeviceStatus::clone(current);
            f(&mut next);
            next.updated_at = Some(Instant::now());
            next
        });
    }

    /// 清空所有字段
    pub fn reset(&self) {
        self.inner.store(Arc::new(DeviceStatus::default()));
    }
}
