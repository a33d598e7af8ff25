//! ### English
//! Test-driven vsync backend: records every arm and fires only when told to.
//!
//! ### 中文
//! 测试驱动的 vsync 后端：记录每一次 arm，仅在被要求时 fire。

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::engine::time::FrameTimings;
use crate::engine::vsync::{FireOutcome, VsyncBackend, VsyncTarget};

#[derive(Default)]
struct DriverShared {
    /// ### English
    /// Tokens in arm order. The lock is released before a token fires.
    ///
    /// ### 中文
    /// 按 arm 顺序排列的令牌；fire 之前会先释放锁。
    pending: Mutex<VecDeque<VsyncTarget>>,
    arms: AtomicUsize,
}

/// ### English
/// Backend half, owned by the waiter.
///
/// ### 中文
/// 后端部分，由 waiter 持有。
pub struct TestDriverBackend {
    shared: Arc<DriverShared>,
}

/// ### English
/// Driver half, kept by the test.
///
/// ### 中文
/// 驱动部分，由测试持有。
#[derive(Clone)]
pub struct TestDriver {
    shared: Arc<DriverShared>,
}

impl TestDriverBackend {
    pub fn new() -> (Self, TestDriver) {
        let shared = Arc::new(DriverShared::default());
        (
            Self {
                shared: shared.clone(),
            },
            TestDriver { shared },
        )
    }
}

impl VsyncBackend for TestDriverBackend {
    fn await_vsync(&self, target: VsyncTarget) {
        self.shared.arms.fetch_add(1, Ordering::SeqCst);
        self.shared.pending.lock().push_back(target);
    }
}

impl TestDriver {
    /// ### English
    /// Total number of `await_vsync` calls received.
    ///
    /// ### 中文
    /// 已收到的 `await_vsync` 调用总数。
    pub fn arm_count(&self) -> usize {
        self.shared.arms.load(Ordering::SeqCst)
    }

    /// ### English
    /// Number of arm tokens not yet fired.
    ///
    /// ### 中文
    /// 尚未 fire 的 arm 令牌数量。
    pub fn pending(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// ### English
    /// Fires the oldest pending token. Returns `None` when nothing is armed.
    ///
    /// ### 中文
    /// fire 最早的待处理令牌；若未 arm 则返回 `None`。
    pub fn fire_next(&self, timings: FrameTimings) -> Option<FireOutcome> {
        self.fire_next_with(timings, true)
    }

    pub fn fire_next_with(
        &self,
        timings: FrameTimings,
        pause_secondary_tasks: bool,
    ) -> Option<FireOutcome> {
        let target = self.shared.pending.lock().pop_front()?;
        Some(target.fire_with(timings, pause_secondary_tasks))
    }

    /// ### English
    /// Fires every token pending at the time of the call; tokens armed by the callbacks stay pending.
    ///
    /// ### 中文
    /// fire 调用时刻所有待处理的令牌；回调中新 arm 的令牌保持待处理。
    pub fn fire_all(&self, timings: FrameTimings) -> Vec<FireOutcome> {
        let targets: Vec<_> = self.shared.pending.lock().drain(..).collect();
        targets
            .into_iter()
            .map(|target| target.fire(timings))
            .collect()
    }

    /// ### English
    /// Removes and returns the pending tokens without firing them.
    ///
    /// ### 中文
    /// 取出并返回待处理令牌，但不 fire。
    pub fn take_pending(&self) -> Vec<VsyncTarget> {
        self.shared.pending.lock().drain(..).collect()
    }
}
