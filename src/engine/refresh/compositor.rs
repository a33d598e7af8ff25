//! ### English
//! Compositor-signaled vsync backend: the embedder owns the refresh signal (compositor event,
//! display link, host-side tick) and delivers it through a `CompositorSignal` handle.
//!
//! ### 中文
//! 合成器信号驱动的 vsync 后端：刷新信号由宿主持有（合成器事件、display link、宿主 tick），
//! 并通过 `CompositorSignal` 句柄送达。

use std::sync::Arc;

use crate::engine::time::FrameTimings;
use crate::engine::vsync::{FireOutcome, VsyncBackend, VsyncTarget};

use super::slot::LatestSlot;

/// ### English
/// Backend half: parks arm tokens until the embedder signals.
///
/// ### 中文
/// 后端部分：暂存 arm 令牌，直到宿主发出信号。
pub struct CompositorSignalBackend {
    slot: Arc<LatestSlot<VsyncTarget>>,
}

/// ### English
/// Embedder half: delivers vsync signals from any thread.
///
/// ### 中文
/// 宿主部分：可在任意线程送达 vsync 信号。
#[derive(Clone)]
pub struct CompositorSignal {
    slot: Arc<LatestSlot<VsyncTarget>>,
    pause_secondary_tasks: bool,
}

impl CompositorSignalBackend {
    /// ### English
    /// Creates the backend and the signal handle the embedder keeps.
    ///
    /// ### 中文
    /// 创建后端以及由宿主持有的信号句柄。
    pub fn new() -> (Self, CompositorSignal) {
        let slot = Arc::new(LatestSlot::default());
        (
            Self { slot: slot.clone() },
            CompositorSignal {
                slot,
                pause_secondary_tasks: true,
            },
        )
    }
}

impl VsyncBackend for CompositorSignalBackend {
    fn await_vsync(&self, target: VsyncTarget) {
        if let Some(displaced) = self.slot.park(target) {
            tracing::debug!(?displaced, "compositor backend re-armed before the previous signal");
        }
    }
}

impl CompositorSignal {
    /// ### English
    /// Sets whether signals from this handle pause the runtime task gate.
    ///
    /// ### 中文
    /// 设置经由本句柄的信号是否暂停运行时任务闸门。
    pub fn with_pause_secondary_tasks(mut self, pause_secondary_tasks: bool) -> Self {
        self.pause_secondary_tasks = pause_secondary_tasks;
        self
    }

    /// ### English
    /// Delivers one vsync. Fires the parked token, or returns `Empty` when nothing is armed.
    ///
    /// #### Parameters
    /// - `timings`: Frame timing pair reported by the compositor.
    ///
    /// ### 中文
    /// 送达一次 vsync：fire 暂存的令牌；若未 arm 则返回 `Empty`。
    ///
    /// #### 参数
    /// - `timings`：合成器报告的帧时间对。
    pub fn signal(&self, timings: FrameTimings) -> FireOutcome {
        match self.slot.take() {
            Some(target) => target.fire_with(timings, self.pause_secondary_tasks),
            None => FireOutcome::Empty,
        }
    }

    /// ### English
    /// Whether an arm token is currently parked on this signal.
    ///
    /// ### 中文
    /// 当前是否有 arm 令牌停放在此信号上。
    pub fn is_awaiting(&self) -> bool {
        self.slot.is_parked()
    }
}
