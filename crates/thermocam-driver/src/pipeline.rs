//! Pipeline 循环模块
//!
//! 两个后台线程：
//! - `io_loop`: 独占串口，写出待发消息，读取字节并解码成帧
//! - `dispatch_loop`: 从接收队列取出消息交给 [`Dispatcher`]
//!
//! 两个循环每个周期检查一次 `is_running`，空闲周期休眠 `poll_interval`。

use crate::dispatcher::Dispatcher;
use crate::metrics::DriverMetrics;
use crate::queue::MessageQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thermocam_protocol::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, ProtocolError, encode_frame};
use thermocam_serial::Transport;
use tracing::{debug, info, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use thermocam_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     poll_interval_ms: 5,
///     ..Default::default()
/// };
/// assert_eq!(config.max_frame_len, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 空闲周期休眠时间（毫秒）
    pub poll_interval_ms: u64,
    /// 单帧负载上限（字节）
    pub max_frame_len: usize,
    /// 单次读取的缓冲区大小（字节）
    pub read_chunk_size: usize,
    /// 停止时等待线程退出的上限（毫秒）
    pub join_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_chunk_size: 64,
            join_timeout_ms: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// IO 线程循环
///
/// # 参数
/// - `transport`: 串口（移动到 IO 线程独占）
/// - `outgoing`: 待发消息（负载，不含分隔符）
/// - `incoming`: 解码出的消息
/// - `metrics`: 计数器
/// - `is_running`: 运行标志
/// - `config`: Pipeline 配置
///
/// 写失败的消息保留到下个周期重试，不会丢失；端口关闭时只休眠，重新打开由外部负责。
pub fn io_loop<T: Transport>(
    mut transport: T,
    outgoing: MessageQueue<String>,
    incoming: MessageQueue<String>,
    metrics: Arc<DriverMetrics>,
    is_running: Arc<AtomicBool>,
    config: PipelineConfig,
) {
    let poll_interval = config.poll_interval();
    let mut decoder = FrameDecoder::with_max_frame_len(config.max_frame_len);
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];
    let mut in_flight: Option<String> = None;

    info!(
        "IO loop started on {}",
        transport.port_label().as_deref().unwrap_or("<closed>")
    );

    while is_running.load(Ordering::Acquire) {
        if !transport.is_open() {
            spin_sleep::sleep(poll_interval);
            continue;
        }

        let mut busy = false;

        // 1. 取出一条待发消息（上一条未写出时保持不动）
        if in_flight.is_none() {
            in_flight = outgoing.try_pop();
        }

        // 2. 写出
        if let Some(message) = in_flight.as_deref() {
            match transport.write_all(&encode_frame(message)) {
                Ok(()) => {
                    debug!("Sent <{}>", message);
                    metrics.messages_written.fetch_add(1, Ordering::Relaxed);
                    in_flight = None;
                    busy = true;
                },
                Err(e) => {
                    warn!("Failed to send <{}>, will retry: {}", message, e);
                    metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                },
            }
        }

        // 3. 读取全部已到达的字节
        loop {
            match transport.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    busy = true;
                    metrics.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                    decoder.feed(&buf[..n], |frame| {
                        handle_frame(frame, &incoming, &metrics);
                    });
                    if n < buf.len() {
                        break;
                    }
                },
                Err(e) => {
                    warn!("Serial read failed: {}", e);
                    metrics.read_errors.fetch_add(1, Ordering::Relaxed);
                    break;
                },
            }
        }

        if !busy {
            spin_sleep::sleep(poll_interval);
        }
    }

    if let Some(message) = in_flight {
        debug!("IO loop stopping with unsent message <{}>", message);
    }
    info!("IO loop stopped");
}

fn handle_frame(
    frame: Result<String, ProtocolError>,
    incoming: &MessageQueue<String>,
    metrics: &DriverMetrics,
) {
    match frame {
        Ok(message) => {
            trace!("Received <{}>", message);
            metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = incoming.push(message) {
                warn!("Dropping received message: {}", e);
                metrics.incoming_dropped.fetch_add(1, Ordering::Relaxed);
            }
        },
        Err(e @ ProtocolError::FrameOverflow { .. }) => {
            warn!("Dropping frame: {}", e);
            metrics.frame_overflows.fetch_add(1, Ordering::Relaxed);
        },
        Err(e) => {
            warn!("Dropping frame: {}", e);
            metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
        },
    }
}

/// 分发线程循环
///
/// 队列为空时休眠 `poll_interval` 后重试，直到 `is_running` 为 false。
pub fn dispatch_loop(
    incoming: MessageQueue<String>,
    dispatcher: Dispatcher,
    is_running: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    info!("Dispatch loop started");
    while is_running.load(Ordering::Acquire) {
        match incoming.try_pop() {
            Some(message) => {
                dispatcher.dispatch(&message);
            },
            None => spin_sleep::sleep(poll_interval),
        }
    }
    info!("Dispatch loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{FillPattern, GridStore};
    use crate::status::StatusStore;
    use std::thread;
    use std::time::Instant;
    use thermocam_serial::mock::MockTransport;

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn spawn_io(
        mock: &MockTransport,
        config: PipelineConfig,
    ) -> (
        MessageQueue<String>,
        MessageQueue<String>,
        Arc<DriverMetrics>,
        Arc<AtomicBool>,
        thread::JoinHandle<()>,
    ) {
        let outgoing = MessageQueue::unbounded();
        let incoming = MessageQueue::unbounded();
        let metrics = Arc::new(DriverMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let handle = {
            let transport = mock.clone();
            let outgoing = outgoing.clone();
            let incoming = incoming.clone();
            let metrics = metrics.clone();
            let is_running = is_running.clone();
            thread::spawn(move || io_loop(transport, outgoing, incoming, metrics, is_running, config))
        };
        (outgoing, incoming, metrics, is_running, handle)
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.join_timeout(), Duration::from_secs(2));
        assert_eq!(config.read_chunk_size, 64);
    }

    #[test]
    fn test_io_loop_decodes_and_writes() {
        let mock = MockTransport::connected();
        let (outgoing, incoming, metrics, is_running, handle) =
            spawn_io(&mock, PipelineConfig::default());

        mock.inject(b"xx<Scan:1:2:12000><INFO:dev=ThermalCamera>");
        outgoing.push("s".to_string()).unwrap();

        assert!(wait_until(Duration::from_secs(2), || incoming.len() == 2));
        assert!(wait_until(Duration::from_secs(2), || mock.written() == b"<s>"));

        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(incoming.try_pop().as_deref(), Some("Scan:1:2:12000"));
        assert_eq!(incoming.try_pop().as_deref(), Some("INFO:dev=ThermalCamera"));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_decoded, 2);
        assert_eq!(snapshot.messages_written, 1);
    }

    #[test]
    fn test_io_loop_counts_bad_frames() {
        let mock = MockTransport::connected();
        let config = PipelineConfig {
            max_frame_len: 8,
            read_chunk_size: 4,
            ..Default::default()
        };
        let (_outgoing, incoming, metrics, is_running, handle) = spawn_io(&mock, config);

        let mut bytes = b"<0123456789abc>".to_vec();
        bytes.extend_from_slice(&[b'<', 0xFF, 0xFE, b'>']);
        bytes.extend_from_slice(b"<ok>");
        mock.inject(&bytes);

        assert!(wait_until(Duration::from_secs(2), || incoming.len() == 1));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frame_overflows, 1);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.bytes_read, bytes.len() as u64);
        assert_eq!(incoming.try_pop().as_deref(), Some("ok"));
    }

    #[test]
    fn test_io_loop_survives_read_errors() {
        let mock = MockTransport::connected();
        mock.fail_next_reads(3);
        let (_outgoing, incoming, metrics, is_running, handle) =
            spawn_io(&mock, PipelineConfig::default());
        mock.inject(b"<INFO:x>");

        assert!(wait_until(Duration::from_secs(2), || incoming.len() == 1));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();
        assert_eq!(metrics.snapshot().read_errors, 3);
    }

    #[test]
    fn test_dispatch_loop() {
        let grid = Arc::new(GridStore::new(8, FillPattern::Sentinel).unwrap());
        let metrics = Arc::new(DriverMetrics::new());
        let dispatcher = Dispatcher::new(grid.clone(), Arc::new(StatusStore::new()), metrics.clone());
        let incoming = MessageQueue::unbounded();
        let is_running = Arc::new(AtomicBool::new(true));

        let handle = {
            let incoming = incoming.clone();
            let is_running = is_running.clone();
            thread::spawn(move || {
                dispatch_loop(incoming, dispatcher, is_running, Duration::from_millis(1))
            })
        };

        incoming.push("Scan:7:7:20000".to_string()).unwrap();
        incoming.push("Bogus".to_string()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            metrics.snapshot().commands_dispatched == 2
        }));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(grid.get(7, 7), Some(20000));
        assert_eq!(metrics.snapshot().unknown_verbs, 1);
    }
}
