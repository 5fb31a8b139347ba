//! 配置管理命令

use super::Context;
use crate::config::CliConfig;
use anyhow::{Result, bail};
use clap::Subcommand;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印当前生效的配置
    Show,

    /// 写出带默认值的配置模板
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                println!("# {}", ctx.config_path.display());
                print!("{}", ctx.config.to_toml()?);
                Ok(())
            },
            ConfigCommand::Init { force } => {
                if ctx.config_path.exists() && !force {
                    bail!(
                        "{} already exists (use --force to overwrite)",
                        ctx.config_path.display()
                    );
                }
                CliConfig::template().save(&ctx.config_path)?;
                println!("✅ Wrote {}", ctx.config_path.display());
                Ok(())
            },
        }
    }
}
