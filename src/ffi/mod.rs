//! ### English
//! C ABI surface for `xian_vsync`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! Callbacks receive the caller's `user_data` pointer back unchanged; the embedder is responsible
//! for keeping it valid until the callback has run or the waiter is destroyed.
//!
//! ### 中文
//! `xian_vsync` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 回调会原样收到调用方传入的 `user_data` 指针；宿主需保证其在回调执行或 waiter 销毁之前有效。
mod abi;
mod gate;
mod waiter;

use std::ffi::c_void;
use std::sync::Arc;

use crate::engine::{BackendHandle, FireOutcome, VsyncWaiter};

/// ### English
/// Opaque waiter handle owning one vsync waiter and its backend handle.
///
/// ### 中文
/// 不透明的 waiter 句柄，持有一个 vsync waiter 及其后端句柄。
pub struct XianVsyncWaiter {
    waiter: Arc<VsyncWaiter>,
    backend: BackendHandle,
}

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Embedder-provided cooperative queue hooks. Either hook may be NULL (treated as a no-op).
///
/// Both hooks are called from the thread that fires vsync and must not block.
///
/// ### 中文
/// 宿主提供的协作队列钩子；任一钩子可为 NULL（视为无操作）。
///
/// 两个钩子都在 fire vsync 的线程上调用，且不得阻塞。
pub struct XianVsyncTaskGate {
    pub pause: XianVsyncClosure,
    pub resume: XianVsyncClosure,
    pub user_data: *mut c_void,
}

/// ### English
/// Primary frame callback: `(user_data, frame_start_ns, frame_target_ns)`.
///
/// ### 中文
/// primary 帧回调：`(user_data, frame_start_ns, frame_target_ns)`。
pub type XianVsyncFrameCallback =
    Option<unsafe extern "C" fn(user_data: *mut c_void, start_ns: u64, target_ns: u64)>;

/// ### English
/// Zero-argument callback: `(user_data)`.
///
/// ### 中文
/// 无参回调：`(user_data)`。
pub type XianVsyncClosure = Option<unsafe extern "C" fn(user_data: *mut c_void)>;

/// ### English
/// Fire outcome codes returned by `xian_vsync_waiter_signal` / `xian_vsync_waiter_fire`.
///
/// ### 中文
/// `xian_vsync_waiter_signal` / `xian_vsync_waiter_fire` 返回的 fire 结果码。
pub const XIAN_VSYNC_FIRE_DELIVERED: u32 = 0;
pub const XIAN_VSYNC_FIRE_EMPTY: u32 = 1;
pub const XIAN_VSYNC_FIRE_DISPOSED: u32 = 2;
pub const XIAN_VSYNC_FIRE_WAITER_GONE: u32 = 3;
/// ### English
/// NULL waiter, or a signal sent to a waiter whose backend is not compositor-signaled.
///
/// ### 中文
/// waiter 为 NULL，或向非合成器信号后端的 waiter 发送信号。
pub const XIAN_VSYNC_FIRE_INVALID: u32 = 4;
/// ### English
/// The signal carried a token for an arm the waiter no longer tracks.
///
/// ### 中文
/// 信号携带的令牌所属 arm 已不再被 waiter 跟踪。
pub const XIAN_VSYNC_FIRE_STALE: u32 = 5;

/// ### English
/// C ABI version for `xian_vsync`.
///
/// ### 中文
/// `xian_vsync` 的 C ABI 版本号。
const XIAN_VSYNC_ABI_VERSION: u32 = 1;

/// ### English
/// Embedder pointer carried into callbacks that may run on another thread.
///
/// ### 中文
/// 携带到可能在其它线程执行的回调中的宿主指针。
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

// The embedder owns the pointee and promises cross-thread validity (see module docs).
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    #[inline]
    fn get(self) -> *mut c_void {
        self.0
    }
}

fn outcome_code(outcome: FireOutcome) -> u32 {
    match outcome {
        FireOutcome::Delivered { .. } => XIAN_VSYNC_FIRE_DELIVERED,
        FireOutcome::Empty => XIAN_VSYNC_FIRE_EMPTY,
        FireOutcome::Disposed => XIAN_VSYNC_FIRE_DISPOSED,
        FireOutcome::WaiterGone => XIAN_VSYNC_FIRE_WAITER_GONE,
        FireOutcome::Stale => XIAN_VSYNC_FIRE_STALE,
    }
}
