//! # Thermocam Driver
//!
//! 串口到应用层的管道：
//!
//! ```text
//! Transport → FrameDecoder → 接收队列 → Dispatcher → GridStore → 观察者
//! CommandSender → 发送队列 → IO 循环 → Transport
//! ```
//!
//! - IO 线程独占串口，读写都不阻塞，空闲时短暂休眠
//! - 分发线程解析消息、写入网格或更新设备状态
//! - 宿主线程读取网格快照、发送命令、注册观察者
//!
//! 大多数用户只需要 [`ThermoCamBuilder`] 和 [`ThermoCam`]。

mod builder;
mod camera;
pub mod discovery;
pub mod dispatcher;
mod error;
pub mod grid;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod sender;
pub mod status;

pub use builder::ThermoCamBuilder;
pub use camera::{CameraOptions, ThermoCam};
pub use discovery::{DiscoveryConfig, DiscoveryReport, ProbedPort, TimeoutGuard, discover};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::DriverError;
pub use grid::{
    ChannelObserver, FillPattern, GridError, GridEvent, GridObserver, GridSnapshot, GridStore,
};
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, dispatch_loop, io_loop};
pub use queue::{MessageQueue, OverflowPolicy, QueuePolicy};
pub use sender::CommandSender;
pub use status::{DeviceStatus, StatusStore};
