//! ### English
//! Backend-facing arm token and the backend capability trait.
//!
//! ### 中文
//! 面向后端的 arm 令牌以及后端能力 trait。

use std::fmt;
use std::sync::Weak;

use crate::engine::time::FrameTimings;

use super::waiter::VsyncWaiter;

/// ### English
/// Platform vsync source.
///
/// `await_vsync` must not block. For every call, the backend must eventually fire the given token
/// exactly once, from any thread, with non-decreasing frame start times across fires.
///
/// ### 中文
/// 平台 vsync 信号源。
///
/// `await_vsync` 不得阻塞。每次调用后，后端必须在之后（可在任意线程）恰好 fire 一次所给令牌，
/// 且多次 fire 之间的帧开始时间单调不减。
pub trait VsyncBackend: Send + Sync {
    /// ### English
    /// Arms the next platform vsync notification.
    ///
    /// #### Parameters
    /// - `target`: Token to fire when the vsync arrives.
    ///
    /// ### 中文
    /// arm 下一次平台 vsync 通知。
    ///
    /// #### 参数
    /// - `target`：vsync 到达时需要 fire 的令牌。
    fn await_vsync(&self, target: VsyncTarget);
}

/// ### English
/// Result of a fire.
///
/// ### 中文
/// 一次 fire 的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireOutcome {
    /// ### English
    /// Callbacks ran: whether a primary callback was present, and how many secondary callbacks ran.
    ///
    /// ### 中文
    /// 回调已执行：是否存在 primary 回调，以及执行的 secondary 回调数量。
    Delivered { primary: bool, secondary: usize },
    /// ### English
    /// The waiter was live but had nothing to deliver.
    ///
    /// ### 中文
    /// waiter 存活，但没有可交付的回调。
    Empty,
    /// ### English
    /// The waiter was disposed; nothing ran and the task gate was not touched.
    ///
    /// ### 中文
    /// waiter 已 dispose；未执行任何回调，也未触碰任务闸门。
    Disposed,
    /// ### English
    /// The waiter was already dropped.
    ///
    /// ### 中文
    /// waiter 已被 drop。
    WaiterGone,
    /// ### English
    /// The token belongs to an arm the waiter no longer tracks; nothing ran and the task gate was
    /// not touched.
    ///
    /// ### 中文
    /// 令牌所属的 arm 已不再被 waiter 跟踪；未执行任何回调，也未触碰任务闸门。
    Stale,
}

impl FireOutcome {
    #[inline]
    pub fn delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// ### English
/// One-shot arm token handed to a backend by `await_vsync`.
///
/// Holds only a weak reference to the waiter: the backend never keeps the waiter alive, and a token
/// outliving its waiter fires as a no-op. `fire` consumes the token, so one arm fires at most once
/// through it. Each token carries the generation of the arm it was minted for; a token whose
/// generation the waiter no longer tracks fires as [`FireOutcome::Stale`].
///
/// ### 中文
/// `await_vsync` 交给后端的一次性 arm 令牌。
///
/// 仅持有 waiter 的弱引用：后端不会延长 waiter 生命周期；waiter 销毁后 fire 该令牌为无操作。
/// `fire` 会消耗令牌，因此同一次 arm 至多经由它 fire 一次。每个令牌携带其所属 arm 的代号；
/// waiter 已不再跟踪该代号时，fire 返回 [`FireOutcome::Stale`]。
pub struct VsyncTarget {
    waiter: Weak<VsyncWaiter>,
    generation: u64,
}

impl VsyncTarget {
    pub(crate) fn new(waiter: Weak<VsyncWaiter>, generation: u64) -> Self {
        Self { waiter, generation }
    }

    /// ### English
    /// Fires the waiter, pausing the runtime task gate around the callbacks.
    ///
    /// ### 中文
    /// fire waiter，并在回调期间暂停运行时任务闸门。
    pub fn fire(self, timings: FrameTimings) -> FireOutcome {
        self.fire_with(timings, true)
    }

    /// ### English
    /// Fires the waiter with an explicit task-gate policy.
    ///
    /// #### Parameters
    /// - `timings`: Frame timing pair delivered to the primary callback.
    /// - `pause_secondary_tasks`: Whether to pause the runtime's cooperative queue during callbacks.
    ///
    /// ### 中文
    /// 以显式的任务闸门策略 fire waiter。
    ///
    /// #### 参数
    /// - `timings`：交付给 primary 回调的帧时间对。
    /// - `pause_secondary_tasks`：回调期间是否暂停运行时的协作队列。
    pub fn fire_with(self, timings: FrameTimings, pause_secondary_tasks: bool) -> FireOutcome {
        match self.waiter.upgrade() {
            Some(waiter) => waiter.fire(timings, pause_secondary_tasks, Some(self.generation)),
            None => {
                tracing::trace!("vsync fired after the waiter was dropped");
                FireOutcome::WaiterGone
            }
        }
    }

    /// ### English
    /// Whether firing would still reach a live, undisposed waiter.
    ///
    /// ### 中文
    /// fire 是否仍会到达一个存活且未 dispose 的 waiter。
    pub fn is_live(&self) -> bool {
        self.waiter
            .upgrade()
            .is_some_and(|waiter| !waiter.is_disposed())
    }
}

impl fmt::Debug for VsyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsyncTarget")
            .field("live", &(self.waiter.strong_count() > 0))
            .field("generation", &self.generation)
            .finish()
    }
}
