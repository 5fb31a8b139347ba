//! 设备查询和舵机控制命令

use super::{Context, REPLY_TIMEOUT};
use anyhow::{Context as _, Result, bail};
use clap::Args;
use thermocam_driver::DeviceStatus;
use thermocam_protocol::{HostCommand, Servo, ServoPosition};

/// 设备信息查询
#[derive(Args, Debug)]
pub struct InfoCommand {}

impl InfoCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let camera = ctx.connect()?;
        camera.commands().query_info()?;
        let status = camera
            .wait_for_status(REPLY_TIMEOUT, |s| s.info.is_some())
            .context("no INFO reply from the device")?;

        println!("Port:   {}", camera.port_label().unwrap_or("<unknown>"));
        println!("Device: {}", status.info.as_deref().unwrap_or_default());
        camera.shutdown();
        Ok(())
    }
}

/// 单点温度查询
#[derive(Args, Debug)]
pub struct TempCommand {}

impl TempCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let camera = ctx.connect()?;
        camera.commands().query_object_temperature()?;
        camera.commands().query_ambient_temperature()?;
        let status = camera
            .wait_for_status(REPLY_TIMEOUT, |s| {
                s.object_reading.is_some() && s.ambient_reading.is_some()
            })
            .context("no temperature reply from the device")?;

        println!("{}", format_temperatures(&status));
        camera.shutdown();
        Ok(())
    }
}

fn format_temperatures(status: &DeviceStatus) -> String {
    let line = |name: &str, raw: Option<i64>, celsius: Option<f64>| match (raw, celsius) {
        (Some(raw), Some(c)) => format!("{:<8} {:>6}  {:>7.2} °C", name, raw, c),
        (Some(raw), None) => format!("{:<8} {:>6}  (out of range)", name, raw),
        _ => format!("{:<8} -", name),
    };
    format!(
        "{}\n{}",
        line("Object", status.object_reading, status.object_celsius()),
        line("Ambient", status.ambient_reading, status.ambient_celsius())
    )
}

/// 舵机控制
#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).multiple(true).args(["a", "b", "dx", "dy"])))]
pub struct ServoCommand {
    /// 舵机 A 寄存器值
    #[arg(long)]
    pub a: Option<i64>,

    /// 舵机 B 寄存器值
    #[arg(long)]
    pub b: Option<i64>,

    /// 舵机 A 相对偏移（0..=65535，加到当前值上）
    #[arg(long, conflicts_with_all = ["a", "b"])]
    pub dx: Option<i64>,

    /// 舵机 B 相对偏移
    #[arg(long, conflicts_with_all = ["a", "b"])]
    pub dy: Option<i64>,
}

impl ServoCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        // 先校验，避免连接后才发现参数越界
        for value in [self.a, self.b].into_iter().flatten() {
            ServoPosition::new(value)?;
        }
        let relative = if self.dx.is_some() || self.dy.is_some() {
            Some(HostCommand::move_relative(
                self.dx.unwrap_or_default(),
                self.dy.unwrap_or_default(),
            )?)
        } else {
            None
        };

        let camera = ctx.connect()?;
        let commands = camera.commands();
        match (relative, self.a, self.b) {
            (Some(command), _, _) => commands.send(command)?,
            (None, Some(a), Some(b)) => commands.set_absolute_position(a, b)?,
            (None, Some(a), None) => commands.set_servo(Servo::A, a)?,
            (None, None, Some(b)) => commands.set_servo(Servo::B, b)?,
            (None, None, None) => bail!("one of --a, --b, --dx or --dy is required"),
        }
        commands.query_absolute_position()?;

        match camera.wait_for_status(REPLY_TIMEOUT, |s| s.servo_positions.is_some()) {
            Ok(status) => {
                if let Some((a, b)) = status.servo_positions {
                    println!("✅ Servo positions: A={} B={}", a, b);
                }
            },
            Err(e) => tracing::warn!("Servo position not confirmed: {}", e),
        }
        camera.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_temperatures() {
        let status = DeviceStatus {
            object_reading: Some(14908),
            ambient_reading: None,
            ..Default::default()
        };
        let text = format_temperatures(&status);
        let mut lines = text.lines();
        let object = lines.next().unwrap();
        assert!(object.starts_with("Object"));
        assert!(object.contains("14908"));
        assert!(object.contains("°C"));
        assert_eq!(lines.next().unwrap().trim_end(), "Ambient  -");
    }

    #[test]
    fn test_servo_args_require_target() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            servo: ServoCommand,
        }

        assert!(Wrapper::try_parse_from(["servo"]).is_err());
        let parsed = Wrapper::try_parse_from(["servo", "--a", "400"]).unwrap();
        assert_eq!(parsed.servo.a, Some(400));
        assert_eq!(parsed.servo.b, None);

        let parsed = Wrapper::try_parse_from(["servo", "--dx", "10"]).unwrap();
        assert_eq!(parsed.servo.dx, Some(10));
        assert_eq!(parsed.servo.dy, None);
        assert!(Wrapper::try_parse_from(["servo", "--a", "400", "--dy", "5"]).is_err());
    }
}
