//! CLI 配置文件
//!
//! 默认位于 `<config_dir>/thermocam/config.toml`，所有字段可选，缺省时使用驱动的默认值。
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! grid_size = 64
//! port_template = "/dev/ttyUSB{n}"
//! probe_range = [0, 15]
//! poll_interval_ms = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thermocam_driver::{PipelineConfig, ThermoCamBuilder};

/// 默认配置文件路径
pub fn default_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("cannot determine the platform config directory")?;
    path.push("thermocam");
    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// 显式端口名（设置后跳过探测）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<usize>,
    /// 探测用的端口名模板，`{n}` 替换为编号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_template: Option<String>,
    /// 探测的端口编号范围（闭区间）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_range: Option<[u16; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl CliConfig {
    /// 读取配置，文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// 写入配置，必要时创建父目录
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    /// `config init` 写出的模板：填入驱动默认值，便于用户修改
    pub fn template() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            port: None,
            baud_rate: Some(9600),
            grid_size: Some(thermocam_protocol::DEFAULT_GRID_SIZE),
            port_template: None,
            probe_range: Some([0, 255]),
            poll_interval_ms: Some(pipeline.poll_interval_ms),
        }
    }

    /// 把配置应用到 builder，命令行指定的端口优先
    pub fn builder(&self, port_override: Option<&str>) -> ThermoCamBuilder {
        let mut builder = ThermoCamBuilder::new();
        if let Some(size) = self.grid_size {
            builder = builder.grid_size(size);
        }
        if let Some(baud) = self.baud_rate {
            builder = builder.baud_rate(baud);
        }
        if let Some(template) = &self.port_template {
            builder = builder.port_template(template.clone());
        }
        if let Some([first, last]) = self.probe_range {
            builder = builder.probe_range(first..=last);
        }
        if let Some(poll) = self.poll_interval_ms {
            builder = builder.pipeline_config(PipelineConfig {
                poll_interval_ms: poll,
                ..Default::default()
            });
        }
        if let Some(port) = port_override.or(self.port.as_deref()) {
            builder = builder.port_name(port);
        }
        builder
    }
}
