//! 相机句柄
//!
//! 提供对外的 `ThermoCam` 结构体，拥有 IO 线程和分发线程、两个队列、网格和状态。

use crate::dispatcher::Dispatcher;
use crate::error::DriverError;
use crate::grid::{FillPattern, GridObserver, GridSnapshot, GridStore};
use crate::metrics::{DriverMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, dispatch_loop, io_loop};
use crate::queue::{MessageQueue, QueuePolicy};
use crate::sender::CommandSender;
use crate::status::{DeviceStatus, StatusStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thermocam_protocol::DEFAULT_GRID_SIZE;
use thermocam_serial::Transport;
use tracing::{error, info};

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        // 看门狗线程负责真正的 join，超时后留给进程退出时回收
        thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "thread panicked during join",
            ))),
        }
    }
}

/// 相机运行参数（由 Builder 填写）
#[derive(Debug, Clone)]
pub struct CameraOptions {
    pub grid_size: usize,
    pub fill: FillPattern,
    pub pipeline: PipelineConfig,
    pub incoming: QueuePolicy,
    pub outgoing: QueuePolicy,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            fill: FillPattern::Sentinel,
            pipeline: PipelineConfig::default(),
            incoming: QueuePolicy::Unbounded,
            outgoing: QueuePolicy::Unbounded,
        }
    }
}

/// 热成像相机（对外 API）
///
/// Drop 时设置停止标志、关闭队列并等待两个线程退出。
pub struct ThermoCam {
    sender: CommandSender,
    incoming: MessageQueue<String>,
    outgoing: MessageQueue<String>,
    grid: Arc<GridStore>,
    status: Arc<StatusStore>,
    metrics: Arc<DriverMetrics>,
    is_running: Arc<AtomicBool>,
    io_thread: Option<JoinHandle<()>>,
    dispatch_thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
    poll_interval: Duration,
    port_label: Option<String>,
}

impl ThermoCam {
    /// 用已经打开的传输启动管道
    pub fn new<T>(transport: T, options: CameraOptions) -> Result<Self, DriverError>
    where
        T: Transport + Send + 'static,
    {
        let grid = Arc::new(GridStore::new(options.grid_size, options.fill)?);
        let status = Arc::new(StatusStore::new());
        let metrics = Arc::new(DriverMetrics::new());
        let incoming = MessageQueue::new(options.incoming);
        let outgoing = MessageQueue::new(options.outgoing);
        let is_running = Arc::new(AtomicBool::new(true));
        let port_label = transport.port_label();
        let poll_interval = options.pipeline.poll_interval();
        let join_timeout = options.pipeline.join_timeout();

        let io_thread = {
            let outgoing = outgoing.clone();
            let incoming = incoming.clone();
            let metrics = metrics.clone();
            let is_running = is_running.clone();
            let config = options.pipeline.clone();
            thread::Builder::new()
                .name("thermocam-io".into())
                .spawn(move || io_loop(transport, outgoing, incoming, metrics, is_running, config))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        let dispatcher = Dispatcher::new(grid.clone(), status.clone(), metrics.clone());
        let dispatch_thread = {
            let incoming = incoming.clone();
            let is_running_for_dispatch = is_running.clone();
            let spawned = thread::Builder::new()
                .name("thermocam-dispatch".into())
                .spawn(move || {
                    dispatch_loop(incoming, dispatcher, is_running_for_dispatch, poll_interval)
                });
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    // IO 线程已经启动，先让它退出
                    is_running.store(false, Ordering::Release);
                    if io_thread.join_timeout(join_timeout).is_err() {
                        error!("IO thread failed to shut down within {:?}", join_timeout);
                    }
                    return Err(DriverError::IoThread(e.to_string()));
                },
            }
        };

        info!(
            "Thermal camera pipeline started ({}x{} grid)",
            options.grid_size, options.grid_size
        );

        Ok(Self {
            sender: CommandSender::new(outgoing.clone()),
            incoming,
            outgoing,
            grid,
            status,
            metrics,
            is_running,
            io_thread: Some(io_thread),
            dispatch_thread: Some(dispatch_thread),
            join_timeout,
            poll_interval,
            port_label,
        })
    }

    /// 命令发送器
    pub fn commands(&self) -> &CommandSender {
        &self.sender
    }

    /// 网格存储（读取、注册观察者）
    pub fn grid(&self) -> &Arc<GridStore> {
        &self.grid
    }

    /// 网格快照
    pub fn snapshot(&self) -> GridSnapshot {
        self.grid.read()
    }

    /// 设备状态
    pub fn status(&self) -> Arc<DeviceStatus> {
        self.status.load()
    }

    /// 指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 注册网格观察者
    pub fn attach(&self, observer: Arc<dyn GridObserver>) -> Result<(), DriverError> {
        Ok(self.grid.attach(observer)?)
    }

    /// 注销网格观察者
    pub fn detach(&self, observer: &Arc<dyn GridObserver>) -> Result<(), DriverError> {
        Ok(self.grid.detach(observer)?)
    }

    /// 重新扫描：清空网格（通知一次）后发送 `s`
    pub fn restart_scan(&self) -> Result<(), DriverError> {
        self.grid.clear();
        self.sender.start_scan()
    }

    /// 等待设备状态满足条件
    ///
    /// 用于查询类命令：发送 `i?` 后等待 `info` 出现。
    pub fn wait_for_status<F>(&self, timeout: Duration, predicate: F) -> Result<Arc<DeviceStatus>, DriverError>
    where
        F: Fn(&DeviceStatus) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status.load();
            if predicate(&status) {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            spin_sleep::sleep(self.poll_interval);
        }
    }

    /// 两个后台线程是否都在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self.io_thread.as_ref().is_some_and(|h| !h.is_finished())
            && self.dispatch_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 打开的端口名称
    pub fn port_label(&self) -> Option<&str> {
        self.port_label.as_deref()
    }

    /// 接收队列中等待分发的消息数
    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    /// 停止管道并等待线程退出
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        // 关闭队列，唤醒可能阻塞在 Block 策略上的入队
        self.outgoing.close();
        self.incoming.close();

        for (name, handle) in [
            ("IO", self.io_thread.take()),
            ("Dispatch", self.dispatch_thread.take()),
        ] {
            if let Some(handle) = handle
                && handle.join_timeout(self.join_timeout).is_err()
            {
                error!(
                    "{} thread panicked or failed to shut down within {:?}",
                    name, self.join_timeout
                );
            }
        }
    }
}

impl Drop for ThermoCam {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ThermoCam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermoCam")
            .field("port", &self.port_label)
            .field("grid_size", &self.grid.size())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermocam_serial::mock::MockTransport;

    fn options() -> CameraOptions {
        CameraOptions {
            grid_size: 8,
            pipeline: PipelineConfig {
                poll_interval_ms: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_grid_rejected() {
        let result = ThermoCam::new(
            MockTransport::connected(),
            CameraOptions {
                grid_size: 0,
                ..options()
            },
        );
        assert!(matches!(result, Err(DriverError::Grid(_))));
    }

    #[test]
    fn test_shutdown_is_prompt() {
        let camera = ThermoCam::new(MockTransport::connected(), options()).unwrap();
        assert!(camera.is_running());
        assert_eq!(camera.port_label(), Some("mock0"));

        let start = Instant::now();
        camera.shutdown();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_wait_for_status_times_out() {
        let camera = ThermoCam::new(MockTransport::connected(), options()).unwrap();
        let result = camera.wait_for_status(Duration::from_millis(20), |s| s.info.is_some());
        assert!(matches!(result, Err(DriverError::Timeout)));
    }
}
