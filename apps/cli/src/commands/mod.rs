//! 命令定义和实现

pub mod config;
pub mod device;
pub mod discover;
pub mod scan;

pub use config::ConfigCommand;
pub use device::{InfoCommand, ServoCommand, TempCommand};
pub use discover::DiscoverCommand;
pub use scan::ScanCommand;

use crate::config::CliConfig;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::time::Duration;
use thermocam_driver::ThermoCam;

/// 查询类命令等待应答的默认时长
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// 所有命令共享的上下文
#[derive(Debug)]
pub struct Context {
    pub config: CliConfig,
    pub config_path: PathBuf,
    /// `--port` 覆盖配置文件中的端口
    pub port: Option<String>,
}

impl Context {
    /// 连接相机（指定端口时直接打开，否则探测）
    pub fn connect(&self) -> Result<ThermoCam> {
        let camera = self
            .config
            .builder(self.port.as_deref())
            .connect()
            .context("failed to connect to the thermal camera")?;
        tracing::info!("Connected on {}", camera.port_label().unwrap_or("<unknown>"));
        Ok(camera)
    }
}
