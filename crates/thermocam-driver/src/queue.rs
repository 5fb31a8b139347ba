//! 线程间消息队列
//!
//! 基于 `crossbeam-channel` 的 FIFO。默认无界；有界时按 [`OverflowPolicy`] 处理满队列。
//! 队列同时持有发送端和接收端，所以永远不会因为对端退出而断开，
//! 停止时通过 [`MessageQueue::close`] 显式关闭。

use crate::error::DriverError;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// `Block` 策略下检查关闭标志的间隔
const BLOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 队列满时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// 等待消费者腾出空间（队列关闭时返回 `ChannelClosed`）
    Block,
    /// 丢弃最旧的一条再入队
    #[default]
    DropOldest,
    /// 拒绝新消息，返回 `QueueFull`
    RejectNew,
}

/// 队列容量策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// 无界（入队永不失败）
    #[default]
    Unbounded,
    /// 有界
    Bounded {
        capacity: usize,
        on_full: OverflowPolicy,
    },
}

/// 线程安全的 FIFO 队列
///
/// 可克隆，所有克隆共享同一个通道。
///
/// # Example
///
/// ```
/// use thermocam_driver::{MessageQueue, OverflowPolicy, QueuePolicy};
///
/// let queue = MessageQueue::new(QueuePolicy::Bounded {
///     capacity: 2,
///     on_full: OverflowPolicy::DropOldest,
/// });
/// for msg in ["a", "b", "c"] {
///     queue.push(msg.to_string()).unwrap();
/// }
/// assert_eq!(queue.try_pop().as_deref(), Some("b"));
/// assert_eq!(queue.evicted(), 1);
/// ```
#[derive(Debug)]
pub struct MessageQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    policy: QueuePolicy,
    closed: Arc<AtomicBool>,
    evicted: Arc<AtomicU64>,
}

impl<T> Clone for MessageQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            policy: self.policy,
            closed: self.closed.clone(),
            evicted: self.evicted.clone(),
        }
    }
}

impl<T> MessageQueue<T> {
    /// 按策略创建队列
    ///
    /// 容量为 0 的有界队列按容量 1 处理（crossbeam 的零容量通道是同步交接，不是队列）。
    pub fn new(policy: QueuePolicy) -> Self {
        let (tx, rx) = match policy {
            QueuePolicy::Unbounded => crossbeam_channel::unbounded(),
            QueuePolicy::Bounded { capacity, .. } => crossbeam_channel::bounded(capacity.max(1)),
        };
        Self {
            tx,
            rx,
            policy,
            closed: Arc::new(AtomicBool::new(false)),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 无界队列
    pub fn unbounded() -> Self {
        Self::new(QueuePolicy::Unbounded)
    }

    /// 入队
    ///
    /// # 错误
    /// - `QueueFull`: 有界队列已满且策略为 `RejectNew`
    /// - `ChannelClosed`: 队列已关闭
    pub fn push(&self, item: T) -> Result<(), DriverError> {
        if self.is_closed() {
            return Err(DriverError::ChannelClosed);
        }
        match self.policy {
            QueuePolicy::Unbounded => self.tx.send(item).map_err(|_| DriverError::ChannelClosed),
            QueuePolicy::Bounded { capacity, on_full } => match on_full {
                OverflowPolicy::RejectNew => match self.tx.try_send(item) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(_)) => Err(DriverError::QueueFull { capacity }),
                    Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
                },
                OverflowPolicy::DropOldest => self.push_evicting(item),
                OverflowPolicy::Block => self.push_blocking(item),
            },
        }
    }

    fn push_evicting(&self, mut item: T) -> Result<(), DriverError> {
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    // 消费者可能同时取走了一条，此时不计入淘汰
                    if self.rx.try_recv().is_ok() {
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                    item = back;
                },
                Err(TrySendError::Disconnected(_)) => return Err(DriverError::ChannelClosed),
            }
        }
    }

    fn push_blocking(&self, mut item: T) -> Result<(), DriverError> {
        loop {
            match self.tx.send_timeout(item, BLOCK_POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.is_closed() {
                        return Err(DriverError::ChannelClosed);
                    }
                    item = back;
                },
                Err(SendTimeoutError::Disconnected(_)) => return Err(DriverError::ChannelClosed),
            }
        }
    }

    /// 非阻塞出队，队列为空时返回 `None`
    ///
    /// 关闭后仍可取出剩余消息。
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// 关闭队列：之后的入队全部失败，阻塞中的入队返回 `ChannelClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 当前排队的消息数
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// 容量策略
    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    /// `DropOldest` 策略淘汰的消息数
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
