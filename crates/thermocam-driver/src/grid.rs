//! 温度网格存储
//!
//! N×N 的读数矩阵，单元格 `(x, y)` 存放在第 `y` 行第 `x` 列。
//! 所有修改都经过边界检查，成功后同步通知观察者。
//!
//! # 锁顺序
//!
//! `write_gate` → `data` → `observers`（只读）。写入和通知在 `write_gate` 内完成，
//! 因此观察者看到的事件顺序与写入顺序一致。观察者可以在回调里读取快照，
//! 但不能调用 `write`/`clear`/`attach`/`detach`。

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thermocam_protocol::{MAX_READING, MIN_READING, SENTINEL, is_valid_reading};
use thiserror::Error;
use tracing::trace;

/// 单元格总数上限（4096×4096）
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// 网格错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// 坐标超出 `[0, size)`
    #[error("Cell ({x}, {y}) outside {size}x{size} grid")]
    CoordinateOutOfRange { x: i64, y: i64, size: usize },

    /// 读数超出 `[MIN_READING, MAX_READING]`
    #[error("Reading {value} outside [{min}, {max}]", min = MIN_READING, max = MAX_READING)]
    ReadingOutOfRange { value: i64 },

    /// 网格尺寸为 0
    #[error("Grid size must be at least 1")]
    EmptyGrid,

    /// 单元格总数超过 [`MAX_GRID_CELLS`]
    #[error("Grid size {size} too large (at most {max} cells)", max = MAX_GRID_CELLS)]
    GridTooLarge { size: usize },

    /// 观察者已注册
    #[error("Observer already attached")]
    ObserverAlreadyAttached,

    /// 观察者未注册
    #[error("Observer not attached")]
    ObserverNotAttached,
}

/// 网格变化事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    /// 单元格被写入
    CellWritten { x: usize, y: usize, value: i32 },
    /// 网格被清空
    Cleared,
}

/// 网格观察者
///
/// 回调在写入线程（通常是分发线程）上同步执行，必须尽快返回。
/// 需要耗时处理时转发到通道，参见 [`ChannelObserver`]。
pub trait GridObserver: Send + Sync {
    fn on_grid_event(&self, event: &GridEvent);
}

impl<F> GridObserver for F
where
    F: Fn(&GridEvent) + Send + Sync,
{
    fn on_grid_event(&self, event: &GridEvent) {
        self(event)
    }
}

/// 把事件转发到 `crossbeam` 通道的观察者
///
/// 使用 `try_send`，接收端处理不过来时事件被丢弃而不是阻塞写入线程，
/// 丢弃数量见 [`ChannelObserver::dropped`]。
pub struct ChannelObserver {
    tx: crossbeam_channel::Sender<GridEvent>,
    dropped: AtomicU64,
}

impl ChannelObserver {
    /// 创建观察者和接收端
    pub fn new(capacity: usize) -> (Self, crossbeam_channel::Receiver<GridEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// 因通道已满或接收端已释放而丢弃的事件数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl GridObserver for ChannelObserver {
    fn on_grid_event(&self, event: &GridEvent) {
        if let Err(e) = self.tx.try_send(*event) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            match e {
                crossbeam_channel::TrySendError::Full(event) => {
                    trace!("Grid event channel full, dropped {:?} ({} total)", event, total)
                },
                crossbeam_channel::TrySendError::Disconnected(event) => {
                    trace!("Grid event receiver gone, dropped {:?} ({} total)", event, total)
                },
            }
        }
    }
}

/// 初始填充方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPattern {
    /// 全部为哨兵值 0
    #[default]
    Sentinel,
    /// 范围内的均匀随机值（演示用）
    ///
    /// 噪声只用于显示：不计入已填充单元格，第一次写入或清空时整张网格先回到哨兵值。
    Noise,
}

/// 网格只读快照
///
/// 按行存储（`cells[y * size + x]`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    size: usize,
    cells: Vec<i32>,
    minimum: Option<i32>,
    maximum: Option<i32>,
    noise: bool,
}

impl GridSnapshot {
    /// 边长
    pub fn size(&self) -> usize {
        self.size
    }

    /// 单元格读数，坐标越界返回 `None`
    pub fn get(&self, x: usize, y: usize) -> Option<i32> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells.get(y * self.size + x).copied()
    }

    /// 按行遍历
    pub fn rows(&self) -> impl Iterator<Item = &[i32]> {
        self.cells.chunks(self.size)
    }

    /// 按行存储的全部单元格
    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// 上次清空以来写入的最小读数
    pub fn minimum(&self) -> Option<i32> {
        self.minimum
    }

    /// 上次清空以来写入的最大读数
    pub fn maximum(&self) -> Option<i32> {
        self.maximum
    }

    /// 是否仍是初始噪声（尚未写入或清空）
    pub fn is_noise(&self) -> bool {
        self.noise
    }

    /// 已写入的非哨兵单元格数量，噪声不计
    pub fn filled_cells(&self) -> usize {
        if self.noise {
            return 0;
        }
        self.cells.iter().filter(|&&v| v != SENTINEL).count()
    }

    /// 所有单元格都已写入
    pub fn is_complete(&self) -> bool {
        self.filled_cells() == self.cells.len()
    }

    /// 消除蛇形扫描造成的列错位
    ///
    /// 舵机来回扫描，相邻两列的运动方向相反，读数在列内整体错开。
    /// 第 `x` 列沿 `y` 方向循环移动 `k` 格，偶数列 `s = shift`，奇数列 `s = -shift`，
    /// `k = floor_even(s) / 2`（向下取偶后减半）。
    ///
    /// 返回新快照，最值不变。`shift` 按 `2 * size` 取模后结果不变。
    pub fn shift_corrected(&self, shift: i64) -> GridSnapshot {
        let n = self.size;
        let mut cells = vec![SENTINEL; self.cells.len()];
        let mut s = shift.rem_euclid((2 * n) as i64);
        for x in 0..n {
            let k = (s - s.rem_euclid(2)).div_euclid(2);
            let k = k.rem_euclid(n as i64) as usize;
            for y in 0..n {
                let src = (y + n - k) % n;
                cells[y * n + x] = self.cells[src * n + x];
            }
            s = -s;
        }
        GridSnapshot {
            size: n,
            cells,
            minimum: self.minimum,
            maximum: self.maximum,
            noise: self.noise,
        }
    }
}

#[derive(Debug)]
struct GridData {
    cells: Vec<i32>,
    minimum: Option<i32>,
    maximum: Option<i32>,
    /// 单元格仍是 `FillPattern::Noise` 的初始值
    noise: bool,
}

/// 温度网格
///
/// # Example
///
/// ```
/// use thermocam_driver::{FillPattern, GridEvent, GridStore};
/// use std::sync::Arc;
///
/// let grid = GridStore::new(4, FillPattern::Sentinel).unwrap();
/// grid.attach(Arc::new(|event: &GridEvent| println!("{event:?}"))).unwrap();
///
/// grid.write(1, 2, 12000).unwrap();
/// assert!(grid.write(4, 0, 12000).is_err());
///
/// let snapshot = grid.read();
/// assert_eq!(snapshot.get(1, 2), Some(12000));
/// assert_eq!(snapshot.minimum(), Some(12000));
/// ```
pub struct GridStore {
    size: usize,
    data: RwLock<GridData>,
    write_gate: Mutex<()>,
    observers: RwLock<Vec<Arc<dyn GridObserver>>>,
}

impl GridStore {
    /// 创建 `size`×`size` 的网格
    ///
    /// 无论填充方式如何，最值都保持未设置，直到第一次写入。
    pub fn new(size: usize, fill: FillPattern) -> Result<Self, GridError> {
        if size == 0 {
            return Err(GridError::EmptyGrid);
        }
        let len = size
            .checked_mul(size)
            .filter(|&len| len <= MAX_GRID_CELLS)
            .ok_or(GridError::GridTooLarge { size })?;
        let cells = match fill {
            FillPattern::Sentinel => vec![SENTINEL; len],
            FillPattern::Noise => {
                let mut rng = rand::thread_rng();
                (0..len).map(|_| rng.gen_range(MIN_READING..=MAX_READING)).collect()
            },
        };
        Ok(Self {
            size,
            data: RwLock::new(GridData {
                cells,
                minimum: None,
                maximum: None,
                noise: fill == FillPattern::Noise,
            }),
            write_gate: Mutex::new(()),
            observers: RwLock::new(Vec::new()),
        })
    }

    /// 边长
    pub fn size(&self) -> usize {
        self.size
    }

    /// 写入一个单元格并通知观察者
    ///
    /// 坐标或读数越界时返回错误，网格和最值都不变，也不通知。
    /// 网格仍是初始噪声时，先清空（观察者先收到 `Cleared`）再写入。
    pub fn write(&self, x: i64, y: i64, value: i64) -> Result<(), GridError> {
        let (cx, cy) = self.checked_coordinates(x, y)?;
        if !is_valid_reading(value) {
            return Err(GridError::ReadingOutOfRange { value });
        }
        // 范围检查后必然能放进 i32
        let value = value as i32;

        let _gate = self.write_gate.lock();
        let wiped_noise = {
            let mut data = self.data.write();
            let wiped_noise = std::mem::take(&mut data.noise);
            if wiped_noise {
                data.cells.fill(SENTINEL);
            }
            data.cells[cy * self.size + cx] = value;
            data.minimum = Some(data.minimum.map_or(value, |m| m.min(value)));
            data.maximum = Some(data.maximum.map_or(value, |m| m.max(value)));
            wiped_noise
        };
        if wiped_noise {
            trace!("Grid noise wiped by first write");
            self.notify(&GridEvent::Cleared);
        }
        trace!("Grid cell ({}, {}) = {}", cx, cy, value);
        self.notify(&GridEvent::CellWritten {
            x: cx,
            y: cy,
            value,
        });
        Ok(())
    }

    /// 清空网格：所有单元格回到哨兵值，最值复位，通知一次
    pub fn clear(&self) {
        let _gate = self.write_gate.lock();
        {
            let mut data = self.data.write();
            data.cells.fill(SENTINEL);
            data.minimum = None;
            data.maximum = None;
            data.noise = false;
        }
        trace!("Grid cleared");
        self.notify(&GridEvent::Cleared);
    }

    /// 只读快照
    pub fn read(&self) -> GridSnapshot {
        let data = self.data.read();
        GridSnapshot {
            size: self.size,
            cells: data.cells.clone(),
            minimum: data.minimum,
            maximum: data.maximum,
            noise: data.noise,
        }
    }

    /// 单个单元格（不复制整张网格）
    pub fn get(&self, x: usize, y: usize) -> Option<i32> {
        if x >= self.size || y >= self.size {
            return None;
        }
        Some(self.data.read().cells[y * self.size + x])
    }

    /// 当前最值 `(minimum, maximum)`
    pub fn range(&self) -> (Option<i32>, Option<i32>) {
        let data = self.data.read();
        (data.minimum, data.maximum)
    }

    /// 注册观察者（按注册顺序通知）
    ///
    /// 同一个 `Arc` 重复注册返回 `ObserverAlreadyAttached`。
    pub fn attach(&self, observer: Arc<dyn GridObserver>) -> Result<(), GridError> {
        let mut observers = self.observers.write();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return Err(GridError::ObserverAlreadyAttached);
        }
        observers.push(observer);
        Ok(())
    }

    /// 注销观察者
    ///
    /// 返回后该观察者不会再收到任何事件。未注册时返回 `ObserverNotAttached`，注册表不变。
    pub fn detach(&self, observer: &Arc<dyn GridObserver>) -> Result<(), GridError> {
        let mut observers = self.observers.write();
        let position = observers
            .iter()
            .position(|o| Arc::ptr_eq(o, observer))
            .ok_or(GridError::ObserverNotAttached)?;
        observers.remove(position);
        Ok(())
    }

    /// 已注册的观察者数量
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    fn checked_coordinates(&self, x: i64, y: i64) -> Result<(usize, usize), GridError> {
        let in_range = |v: i64| usize::try_from(v).ok().filter(|&v| v < self.size);
        match (in_range(x), in_range(y)) {
            (Some(cx), Some(cy)) => Ok((cx, cy)),
            _ => Err(GridError::CoordinateOutOfRange {
                x,
                y,
                size: self.size,
            }),
        }
    }

    fn notify(&self, event: &GridEvent) {
        for observer in self.observers.read().iter() {
            observer.on_grid_event(event);
        }
    }
}

impl std::fmt::Debug for GridStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStore")
            .field("size", &self.size)
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<GridEvent>>,
    }

    impl GridObserver for Recorder {
        fn on_grid_event(&self, event: &GridEvent) {
            self.events.lock().push(*event);
        }
    }

    impl Recorder {
        fn events(&self) -> Vec<GridEvent> {
            self.events.lock().clone()
        }
    }

    fn grid(size: usize) -> GridStore {
        GridStore::new(size, FillPattern::Sentinel).unwrap()
    }

    #[test]
    fn test_write_and_read() {
        let grid = grid(64);
        grid.write(3, 5, 12000).unwrap();
        let snapshot = grid.read();
        // (x, y) 在第 y 行第 x 列
        assert_eq!(snapshot.rows().nth(5).unwrap()[3], 12000);
        assert_eq!(snapshot.get(3, 5), Some(12000));
        assert_eq!(snapshot.get(5, 3), Some(SENTINEL));
        assert_eq!(grid.get(3, 5), Some(12000));
        assert_eq!(snapshot.filled_cells(), 1);
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert_eq!(
            GridStore::new(0, FillPattern::Sentinel).unwrap_err(),
            GridError::EmptyGrid
        );
    }

    #[test]
    fn test_reading_bounds() {
        let grid = grid(4);
        assert!(grid.write(0, 0, i64::from(MIN_READING)).is_ok());
        assert!(grid.write(0, 0, i64::from(MAX_READING)).is_ok());
        assert_eq!(
            grid.write(0, 0, i64::from(MIN_READING) - 1),
            Err(GridError::ReadingOutOfRange {
                value: i64::from(MIN_READING) - 1
            })
        );
        assert!(grid.write(0, 0, i64::from(MAX_READING) + 1).is_err());
        assert!(grid.write(0, 0, 0).is_err());
    }

    #[test]
    fn test_min_max_tracking_and_clear() {
        let grid = grid(8);
        assert_eq!(grid.range(), (None, None));

        grid.write(0, 0, 15000).unwrap();
        assert_eq!(grid.range(), (Some(15000), Some(15000)));
        grid.write(1, 0, 14000).unwrap();
        grid.write(2, 0, 16000).unwrap();
        grid.write(3, 0, 15500).unwrap();
        assert_eq!(grid.range(), (Some(14000), Some(16000)));

        // 覆盖最小值所在单元格不会抬高最小值
        grid.write(1, 0, 15000).unwrap();
        assert_eq!(grid.range(), (Some(14000), Some(16000)));

        grid.clear();
        assert_eq!(grid.range(), (None, None));
        assert_eq!(grid.read().filled_cells(), 0);

        grid.write(5, 5, 13000).unwrap();
        assert_eq!(grid.range(), (Some(13000), Some(13000)));
    }

    #[test]
    fn test_notification_order_and_detach() {
        let grid = grid(4);
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let tag = |name: &'static str| {
            let order = order.clone();
            Arc::new(move |_: &GridEvent| order.lock().push(name)) as Arc<dyn GridObserver>
        };
        let tag_a = tag("a");
        let tag_b = tag("b");
        grid.attach(tag_a.clone()).unwrap();
        grid.attach(tag_b.clone()).unwrap();
        grid.attach(first.clone()).unwrap();
        grid.attach(second.clone()).unwrap();

        grid.write(1, 1, 12000).unwrap();
        assert_eq!(*order.lock(), vec!["a", "b"]);
        assert_eq!(
            first.events(),
            vec![GridEvent::CellWritten {
                x: 1,
                y: 1,
                value: 12000
            }]
        );

        let second_dyn: Arc<dyn GridObserver> = second.clone();
        grid.detach(&second_dyn).unwrap();
        grid.clear();
        assert_eq!(first.events().len(), 2);
        assert_eq!(first.events()[1], GridEvent::Cleared);
        assert_eq!(second.events().len(), 1);
    }

    #[test]
    fn test_failed_write_does_not_notify() {
        let grid = grid(4);
        let recorder = Arc::new(Recorder::default());
        grid.attach(recorder.clone()).unwrap();

        assert!(grid.write(4, 0, 12000).is_err());
        assert!(grid.write(0, -1, 12000).is_err());
        assert!(grid.write(0, 0, 5).is_err());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_duplicate_attach_and_missing_detach() {
        let grid = grid(4);
        let recorder: Arc<dyn GridObserver> = Arc::new(Recorder::default());
        grid.attach(recorder.clone()).unwrap();
        assert_eq!(
            grid.attach(recorder.clone()),
            Err(GridError::ObserverAlreadyAttached)
        );
        assert_eq!(grid.observer_count(), 1);

        let stranger: Arc<dyn GridObserver> = Arc::new(Recorder::default());
        assert_eq!(grid.detach(&stranger), Err(GridError::ObserverNotAttached));
        assert_eq!(grid.observer_count(), 1);

        grid.detach(&recorder).unwrap();
        assert_eq!(grid.detach(&recorder), Err(GridError::ObserverNotAttached));
        assert_eq!(grid.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_read_snapshot() {
        let grid = Arc::new(grid(4));
        let seen = Arc::new(Mutex::new(None));
        {
            let grid_ref = Arc::downgrade(&grid);
            let seen = seen.clone();
            grid.attach(Arc::new(move |_: &GridEvent| {
                if let Some(grid) = grid_ref.upgrade() {
                    *seen.lock() = grid.read().get(2, 3);
                }
            }))
            .unwrap();
        }
        grid.write(2, 3, 20000).unwrap();
        assert_eq!(*seen.lock(), Some(20000));
    }

    #[test]
    fn test_channel_observer() {
        let grid = grid(4);
        let (observer, rx) = ChannelObserver::new(8);
        grid.attach(Arc::new(observer)).unwrap();
        grid.write(0, 0, 12000).unwrap();
        grid.clear();
        assert_eq!(
            rx.try_recv().unwrap(),
            GridEvent::CellWritten {
                x: 0,
                y: 0,
                value: 12000
            }
        );
        assert_eq!(rx.try_recv().unwrap(), GridEvent::Cleared);
    }

    #[test]
    fn test_noise_fill() {
        let grid = GridStore::new(16, FillPattern::Noise).unwrap();
        let snapshot = grid.read();
        assert!(
            snapshot
                .cells()
                .iter()
                .all(|&v| (MIN_READING..=MAX_READING).contains(&v))
        );
        assert!(snapshot.is_noise());
        assert_eq!(snapshot.filled_cells(), 0);
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.minimum(), None);
        assert_eq!(snapshot.maximum(), None);
    }

    #[test]
    fn test_first_write_wipes_noise() {
        let grid = GridStore::new(8, FillPattern::Noise).unwrap();
        let recorder = Arc::new(Recorder::default());
        grid.attach(recorder.clone()).unwrap();

        grid.write(0, 0, 15000).unwrap();
        let snapshot = grid.read();
        assert!(!snapshot.is_noise());
        assert_eq!(snapshot.filled_cells(), 1);
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.get(0, 0), Some(15000));
        let outside = snapshot
            .cells()
            .iter()
            .filter(|&&v| v != SENTINEL && !(15000..=15000).contains(&v))
            .count();
        assert_eq!(outside, 0);
        assert_eq!(
            recorder.events(),
            vec![
                GridEvent::Cleared,
                GridEvent::CellWritten {
                    x: 0,
                    y: 0,
                    value: 15000
                }
            ]
        );

        // 之后的写入不再清空
        grid.write(1, 0, 16000).unwrap();
        assert_eq!(grid.read().filled_cells(), 2);
        assert_eq!(recorder.events().len(), 3);
    }

    #[test]
    fn test_clear_drops_noise() {
        let grid = GridStore::new(4, FillPattern::Noise).unwrap();
        grid.clear();
        let snapshot = grid.read();
        assert!(!snapshot.is_noise());
        assert!(snapshot.cells().iter().all(|&v| v == SENTINEL));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        assert_eq!(
            GridStore::new(usize::MAX, FillPattern::Sentinel).unwrap_err(),
            GridError::GridTooLarge { size: usize::MAX }
        );
        assert_eq!(
            GridStore::new(4097, FillPattern::Sentinel).unwrap_err(),
            GridError::GridTooLarge { size: 4097 }
        );
        assert!(GridStore::new(4096, FillPattern::Sentinel).is_ok());
    }

    #[test]
    fn test_channel_observer_counts_drops() {
        let grid = grid(4);
        let (observer, rx) = ChannelObserver::new(1);
        let observer = Arc::new(observer);
        grid.attach(observer.clone()).unwrap();

        grid.write(0, 0, 12000).unwrap();
        grid.write(1, 0, 13000).unwrap();
        grid.clear();
        assert_eq!(observer.dropped(), 2);
        assert_eq!(
            rx.try_recv().unwrap(),
            GridEvent::CellWritten {
                x: 0,
                y: 0,
                value: 12000
            }
        );
        assert!(rx.try_recv().is_err());

        drop(rx);
        grid.write(2, 0, 14000).unwrap();
        assert_eq!(observer.dropped(), 3);
    }

    /// 3×3 网格，列值为 10*x + y，便于核对移动方向
    fn column_grid() -> GridSnapshot {
        let n = 3;
        let mut cells = vec![0; n * n];
        for y in 0..n {
            for x in 0..n {
                cells[y * n + x] = (10 * x + y) as i32;
            }
        }
        GridSnapshot {
            size: n,
            cells,
            minimum: None,
            maximum: None,
            noise: false,
        }
    }

    #[test]
    fn test_shift_correction_extreme_shifts() {
        let snapshot = column_grid();
        // 周期为 2 * size = 6
        assert_eq!(
            snapshot.shift_corrected(i64::MIN),
            snapshot.shift_corrected(i64::MIN.rem_euclid(6))
        );
        assert_eq!(
            snapshot.shift_corrected(i64::MAX),
            snapshot.shift_corrected(i64::MAX.rem_euclid(6))
        );
        assert_eq!(snapshot.shift_corrected(-4), snapshot.shift_corrected(2));
        assert_eq!(snapshot.shift_corrected(7), snapshot.shift_corrected(1));
    }

    #[test]
    fn test_shift_correction() {
        let snapshot = column_grid();
        assert_eq!(snapshot.shift_corrected(0), snapshot);
        // shift = 1: floor_even(1)/2 = 0，floor_even(-1)/2 = -1
        assert_eq!(snapshot.shift_corrected(1), {
            let mut expected = snapshot.clone();
            // 第 1 列向上移动一格：新 y 取旧 y+1
            for y in 0..3 {
                expected.cells[y * 3 + 1] = (10 + (y + 1) % 3) as i32;
            }
            expected
        });

        // shift = 2：偶数列下移一格，奇数列上移一格
        let corrected = snapshot.shift_corrected(2);
        assert_eq!(corrected.get(0, 0), Some(2));
        assert_eq!(corrected.get(0, 1), Some(0));
        assert_eq!(corrected.get(1, 0), Some(11));
        assert_eq!(corrected.get(1, 2), Some(10));
        assert_eq!(corrected.get(2, 1), Some(20));
    }

    proptest! {
        #[test]
        fn grid_bounds_hold_for_any_size(
            size in 1usize..16,
            x in -20i64..20,
            y in -20i64..20,
            value in 0i64..40000,
        ) {
            let grid = grid(size);
            grid.write(0, 0, 15000).unwrap();
            let before = grid.read();
            let result = grid.write(x, y, value);
            let in_bounds = (0..size as i64).contains(&x)
                && (0..size as i64).contains(&y)
                && is_valid_reading(value);
            prop_assert_eq!(result.is_ok(), in_bounds);
            if !in_bounds {
                prop_assert_eq!(grid.read(), before);
            }
        }

        #[test]
        fn min_max_bracket_written_cells(
            writes in proptest::collection::vec((0i64..8, 0i64..8, 10157i64..=32767), 1..64)
        ) {
            let grid = grid(8);
            let mut min = i64::MAX;
            let mut max = i64::MIN;
            for &(x, y, v) in &writes {
                grid.write(x, y, v).unwrap();
                min = min.min(v);
                max = max.max(v);
            }
            let snapshot = grid.read();
            prop_assert_eq!(snapshot.minimum(), Some(min as i32));
            prop_assert_eq!(snapshot.maximum(), Some(max as i32));
            for &cell in snapshot.cells().iter().filter(|&&c| c != SENTINEL) {
                prop_assert!(i64::from(cell) >= min && i64::from(cell) <= max);
            }
        }

        #[test]
        fn shift_correction_is_a_column_permutation(shift in -10i64..10) {
            let snapshot = column_grid();
            let corrected = snapshot.shift_corrected(shift);
            for x in 0..3 {
                let mut before: Vec<i32> = (0..3).filter_map(|y| snapshot.get(x, y)).collect();
                let mut after: Vec<i32> = (0..3).filter_map(|y| corrected.get(x, y)).collect();
                before.sort_unstable();
                after.sort_unstable();
                prop_assert_eq!(before, after);
            }
        }
    }
}
