/// ### English
/// `xian_vsync` crate root.
/// Exposes the C ABI via `ffi`; the vsync waiter and its backends live under `engine`.
///
/// ### 中文
/// `xian_vsync` 的 crate 根。
/// 通过 `ffi` 导出 C ABI；vsync waiter 及其后端位于 `engine` 模块。
pub mod engine;
mod ffi;

pub use engine::{
    BackendHandle, CompositorSignal, CompositorSignalBackend, FireOutcome, FixedRefreshClock,
    FrameClock, FrameScheduler, FrameTimePoint, FrameTimings, GatePause, MicrotaskQueue,
    NoopTaskGate, PrimaryCallback, SecondaryCallback, SecondaryCallbackRegistry, TaskGate,
    TestDriver, TestDriverBackend, TimerBackend, VsyncBackend, VsyncConfig, VsyncError,
    VsyncResult, VsyncTarget, VsyncWaiter, WaiterState, build_waiter,
};
