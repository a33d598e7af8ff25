//! ### English
//! Bitflags controlling optional waiter behaviors.
//!
//! These are passed through the C ABI as a `u32` bitmask.
//!
//! ### 中文
//! 控制 waiter 可选行为的位标志（bitflags）。
//!
//! 通过 C ABI 以 `u32` 位掩码传入。
/// ### English
/// Do not pause the embedder's cooperative task queue while vsync callbacks run.
///
/// Use this when the embedder runs its own microtask checkpoint after each frame and does not want
/// the waiter to gate it.
///
/// ### 中文
/// vsync 回调执行期间不暂停宿主的协作任务队列。
///
/// 适用于宿主在每帧之后自行执行微任务检查点、不希望由 waiter 控制的场景。
pub const XIAN_VSYNC_FLAG_NO_PAUSE_SECONDARY_TASKS: u32 = 1 << 0;

/// ### English
/// Mask of every flag understood by this build; unknown bits are ignored.
///
/// ### 中文
/// 当前构建识别的全部标志位掩码；未知位会被忽略。
pub const XIAN_VSYNC_FLAGS_KNOWN: u32 = XIAN_VSYNC_FLAG_NO_PAUSE_SECONDARY_TASKS;
