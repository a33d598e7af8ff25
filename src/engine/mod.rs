/// ### English
/// Engine internal modules (frame timing, vsync waiter, refresh backends, runtime task gate).
///
/// ### 中文
/// 引擎内部模块（帧时间、vsync waiter、刷新后端、运行时任务闸门）。
pub mod clock;
pub mod config;
pub mod error;
pub mod flags;
pub mod gate;
pub mod microtask;
pub mod refresh;
pub mod time;
pub mod vsync;

pub use clock::{FixedRefreshClock, FrameClock};
pub use config::{BackendHandle, VsyncConfig, build_waiter};
pub use error::{VsyncError, VsyncResult};
pub use gate::{GatePause, NoopTaskGate, TaskGate};
pub use microtask::MicrotaskQueue;
pub use refresh::{
    CompositorSignal, CompositorSignalBackend, FrameScheduler, TestDriver, TestDriverBackend,
    TimerBackend,
};
pub use time::{FrameTimePoint, FrameTimings};
pub use vsync::{
    FireOutcome, PrimaryCallback, SecondaryCallback, SecondaryCallbackRegistry, VsyncBackend,
    VsyncTarget, VsyncWaiter, WaiterState,
};
