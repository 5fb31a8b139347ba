//! # Thermocam CLI
//!
//! 舵机扫描式热像仪的命令行工具。
//!
//! ```bash
//! # 探测相机所在的串口
//! thermocam-cli discover
//!
//! # 单点测温
//! thermocam-cli temp
//!
//! # 完整扫描，校正蛇形扫描错位
//! thermocam-cli scan --shift 3
//!
//! # 写出配置模板（之后可以在其中固定端口）
//! thermocam-cli config init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    ConfigCommand, Context, DiscoverCommand, InfoCommand, ScanCommand, ServoCommand, TempCommand,
};
use config::CliConfig;

/// 未设置 `RUST_LOG` 时的日志过滤
const DEFAULT_FILTER: &str = "thermocam_cli=info,thermocam_driver=info";
const VERBOSE_FILTER: &str = "thermocam_cli=debug,thermocam_driver=debug,thermocam_serial=debug";

/// Thermocam CLI - 热像仪命令行工具
#[derive(Parser, Debug)]
#[command(name = "thermocam-cli")]
#[command(about = "Command-line interface for the servo-driven thermal scanner", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/thermocam/config.toml）
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_file: Option<PathBuf>,

    /// 串口名称（覆盖配置，跳过探测）
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// 输出驱动调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 探测相机所在的串口
    Discover {
        #[command(flatten)]
        args: DiscoverCommand,
    },

    /// 查询设备信息
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },

    /// 查询目标和环境温度
    Temp {
        #[command(flatten)]
        args: TempCommand,
    },

    /// 移动舵机
    Servo {
        #[command(flatten)]
        args: ServoCommand,
    },

    /// 执行一次完整扫描
    Scan {
        #[command(flatten)]
        args: ScanCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn init_logging(verbose: bool) {
    // RUST_LOG 优先
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(verbose).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config_file {
        Some(path) => path,
        None => config::default_path()?,
    };
    let ctx = Context {
        config: CliConfig::load(&config_path)?,
        config_path,
        port: cli.port,
    };

    match cli.command {
        Commands::Discover { args } => args.execute(&ctx),
        Commands::Info { args } => args.execute(&ctx),
        Commands::Temp { args } => args.execute(&ctx),
        Commands::Servo { args } => args.execute(&ctx),
        Commands::Scan { args } => args.execute(&ctx),
        Commands::Config(cmd) => cmd.execute(&ctx),
    }
}
