//! 扫描命令
//!
//! 清空网格并启动扫描，等到网格填满、超时或 Ctrl-C，然后打印统计和粗略的字符热图。

use super::Context;
use anyhow::{Context as _, Result};
use clap::Args;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thermocam_driver::GridSnapshot;
use thermocam_protocol::{SENTINEL, reading_to_celsius};
use tracing::info;

/// 热图字符，从冷到热
const RAMP: &[u8] = b" .:-=+*#%@";

/// 未写入的单元格
const EMPTY_CELL: char = '?';

/// 热图最大列数，更大的网格按块取平均
const MAX_MAP_WIDTH: usize = 32;

/// 扫描命令参数
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// 最长等待时间（秒）
    #[arg(short, long, default_value_t = 600)]
    pub timeout: u64,

    /// 蛇形扫描的列错位校正量
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub shift: i64,
}

/// 等待结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Complete,
    Timeout,
    Interrupted,
}

impl ScanCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let interrupted = Arc::new(AtomicBool::new(false));
        {
            let interrupted = interrupted.clone();
            ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
                .context("failed to install Ctrl-C handler")?;
        }

        let camera = ctx.connect()?;
        camera.restart_scan()?;
        println!("⏳ Scanning (Ctrl-C to stop early)...");

        let started = Instant::now();
        let timeout = Duration::from_secs(self.timeout);
        let mut last_report = Instant::now();
        let reason = loop {
            let snapshot = camera.snapshot();
            if snapshot.is_complete() {
                break StopReason::Complete;
            }
            if interrupted.load(Ordering::SeqCst) {
                break StopReason::Interrupted;
            }
            if started.elapsed() >= timeout {
                break StopReason::Timeout;
            }
            if last_report.elapsed() >= Duration::from_secs(5) {
                info!(
                    "Scan progress: {}/{} cells",
                    snapshot.filled_cells(),
                    snapshot.cells().len()
                );
                last_report = Instant::now();
            }
            std::thread::sleep(Duration::from_millis(100));
        };

        let snapshot = camera.snapshot();
        let metrics = camera.metrics();
        camera.shutdown();

        let snapshot = if self.shift != 0 {
            snapshot.shift_corrected(self.shift)
        } else {
            snapshot
        };

        match reason {
            StopReason::Complete => {
                println!("✅ Scan complete in {:.1} s", started.elapsed().as_secs_f64())
            },
            StopReason::Timeout => println!("⚠️ Timed out after {} s", self.timeout),
            StopReason::Interrupted => println!("🛑 Interrupted"),
        }
        println!("{}", summary(&snapshot));
        if metrics.rejected_total() > 0 {
            println!(
                "Rejected messages: {} (malformed {}, out of range {}, unknown {})",
                metrics.rejected_total(),
                metrics.malformed_commands,
                metrics.range_errors,
                metrics.unknown_verbs
            );
        }
        println!();
        print!("{}", heat_map(&snapshot, MAX_MAP_WIDTH));
        Ok(())
    }
}

/// 覆盖率和温度范围
fn summary(snapshot: &GridSnapshot) -> String {
    let total = snapshot.cells().len();
    let filled = snapshot.filled_cells();
    let coverage = if total == 0 { 0.0 } else { filled as f64 * 100.0 / total as f64 };
    let mut text = format!("Coverage: {}/{} cells ({:.1}%)", filled, total, coverage);
    if let (Some(min), Some(max)) = (snapshot.minimum(), snapshot.maximum()) {
        text.push_str(&format!(
            "\nMin: {:.2} °C\nMax: {:.2} °C",
            reading_to_celsius(min),
            reading_to_celsius(max)
        ));
    }
    text
}

/// 字符热图
///
/// 每个字符对应 `block × block` 个单元格的平均值（只计已写入的），
/// 全部未写入时输出 [`EMPTY_CELL`]。
fn heat_map(snapshot: &GridSnapshot, max_width: usize) -> String {
    let size = snapshot.size();
    let (Some(min), Some(max)) = (snapshot.minimum(), snapshot.maximum()) else {
        return String::new();
    };
    let block = size.div_ceil(max_width.max(1)).max(1);
    let span = f64::from(max - min).max(1.0);

    let mut out = String::new();
    for by in (0..size).step_by(block) {
        for bx in (0..size).step_by(block) {
            let mut sum = 0i64;
            let mut count = 0i64;
            for y in by..(by + block).min(size) {
                for x in bx..(bx + block).min(size) {
                    if let Some(v) = snapshot.get(x, y).filter(|&v| v != SENTINEL) {
                        sum += i64::from(v);
                        count += 1;
                    }
                }
            }
            if count == 0 {
                out.push(EMPTY_CELL);
                continue;
            }
            let mean = (sum / count) as f64;
            let level = ((mean - f64::from(min)) / span * (RAMP.len() - 1) as f64).round() as usize;
            out.push(char::from(RAMP[level.min(RAMP.len() - 1)]));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermocam_driver::{FillPattern, GridStore};

    fn grid(size: usize, cells: &[(i64, i64, i64)]) -> GridSnapshot {
        let store = GridStore::new(size, FillPattern::Sentinel).unwrap();
        for &(x, y, v) in cells {
            store.write(x, y, v).unwrap();
        }
        store.read()
    }

    #[test]
    fn test_heat_map_extremes() {
        let snapshot = grid(2, &[(0, 0, 12000), (1, 0, 20000), (0, 1, 16000)]);
        assert_eq!(heat_map(&snapshot, 32), " @\n+?\n");
    }

    #[test]
    fn test_heat_map_downsamples() {
        let cells: Vec<_> = (0..8)
            .flat_map(|x| (0..8).map(move |y| (x, y, 15000)))
            .collect();
        let snapshot = grid(8, &cells);
        let map = heat_map(&snapshot, 4);
        assert_eq!(map.lines().count(), 4);
        assert!(map.lines().all(|line| line.chars().count() == 4));
    }

    #[test]
    fn test_empty_grid_has_no_map() {
        let snapshot = grid(4, &[]);
        assert_eq!(heat_map(&snapshot, 32), "");
        assert_eq!(summary(&snapshot), "Coverage: 0/16 cells (0.0%)");
    }

    #[test]
    fn test_summary_reports_range() {
        let snapshot = grid(2, &[(0, 0, 14908), (1, 1, 14658)]);
        let text = summary(&snapshot);
        assert!(text.starts_with("Coverage: 2/4 cells (50.0%)"));
        assert!(text.contains("Min: "));
        assert!(text.contains("Max: "));
    }
}
