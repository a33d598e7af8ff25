//! ### English
//! Timer-driven vsync backend (fixed refresh rate, software vsync).
//!
//! ### 中文
//! 计时驱动的 vsync 后端（固定刷新率的软件 vsync）。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::clock::{FixedRefreshClock, FrameClock};
use crate::engine::time::FrameTimePoint;
use crate::engine::vsync::{VsyncBackend, VsyncTarget};

use super::scheduler::FrameScheduler;

/// ### English
/// Backend that fires on the boundaries of a `FixedRefreshClock`, using a shared `FrameScheduler`.
///
/// ### 中文
/// 在 `FixedRefreshClock` 边界上 fire 的后端，使用共享的 `FrameScheduler`。
pub struct TimerBackend {
    scheduler: Arc<FrameScheduler>,
    clock: FixedRefreshClock,
    /// ### English
    /// Start time of the most recently armed frame; the next arm never reuses it.
    ///
    /// ### 中文
    /// 最近一次 arm 的帧开始时间；下一次 arm 不会复用该时间。
    last_start_ns: AtomicU64,
    pause_secondary_tasks: bool,
}

impl TimerBackend {
    /// ### English
    /// Creates a timer backend.
    ///
    /// #### Parameters
    /// - `scheduler`: Shared scheduler thread.
    /// - `clock`: Frame grid to fire on.
    ///
    /// ### 中文
    /// 创建计时后端。
    ///
    /// #### 参数
    /// - `scheduler`：共享调度线程。
    /// - `clock`：用于 fire 的帧网格。
    pub fn new(scheduler: Arc<FrameScheduler>, clock: FixedRefreshClock) -> Self {
        Self {
            scheduler,
            clock,
            last_start_ns: AtomicU64::new(0),
            pause_secondary_tasks: true,
        }
    }

    /// ### English
    /// Sets whether fires from this backend pause the runtime task gate.
    ///
    /// ### 中文
    /// 设置本后端的 fire 是否暂停运行时任务闸门。
    pub fn with_pause_secondary_tasks(mut self, pause_secondary_tasks: bool) -> Self {
        self.pause_secondary_tasks = pause_secondary_tasks;
        self
    }

    pub fn clock(&self) -> &FixedRefreshClock {
        &self.clock
    }
}

impl VsyncBackend for TimerBackend {
    fn await_vsync(&self, target: VsyncTarget) {
        let now = FrameTimePoint::now();
        let floor =
            FrameTimePoint::from_nanos(self.last_start_ns.load(Ordering::Acquire).saturating_add(1));
        let timings = self.clock.next_frame(now.max(floor));
        self.last_start_ns
            .fetch_max(timings.start().as_nanos(), Ordering::AcqRel);

        let delay = timings.start().saturating_duration_since(now);
        let pause_secondary_tasks = self.pause_secondary_tasks;
        self.scheduler.schedule(delay, move || {
            target.fire_with(timings, pause_secondary_tasks);
        });
    }
}
