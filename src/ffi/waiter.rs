//! ### English
//! C ABI bindings for the vsync waiter lifecycle (create/destroy/wait/schedule/signal/fire).
//!
//! ### 中文
//! vsync waiter 生命周期相关的 C ABI 绑定（create/destroy/wait/schedule/signal/fire）。

use std::ffi::c_void;
use std::sync::Arc;

use crate::engine::flags::XIAN_VSYNC_FLAGS_KNOWN;
use crate::engine::{
    FrameTimePoint, FrameTimings, NoopTaskGate, TaskGate, VsyncConfig, build_waiter,
};

use super::gate::ForeignTaskGate;
use super::{
    UserData, XIAN_VSYNC_FIRE_INVALID, XianVsyncClosure, XianVsyncFrameCallback, XianVsyncTaskGate,
    XianVsyncWaiter, outcome_code,
};

#[unsafe(no_mangle)]
/// ### English
/// Creates a vsync waiter.
///
/// - `target_fps == 0`: the embedder delivers vsync with `xian_vsync_waiter_signal`.
/// - Otherwise: a software timer fires at `target_fps`, shifted by `vsync_offset_us`.
///
/// `gate` may be NULL (no cooperative queue). Returns NULL if the timer thread cannot be started.
///
/// ### 中文
/// 创建 vsync waiter。
///
/// - `target_fps == 0`：由宿主调用 `xian_vsync_waiter_signal` 送达 vsync。
/// - 其它值：软件计时器按 `target_fps` fire，并偏移 `vsync_offset_us`。
///
/// `gate` 可为 NULL（无协作队列）。若无法启动计时线程则返回 NULL。
pub unsafe extern "C" fn xian_vsync_waiter_create(
    target_fps: u32,
    vsync_offset_us: u64,
    flags: u32,
    gate: *const XianVsyncTaskGate,
) -> *mut XianVsyncWaiter {
    if flags & !XIAN_VSYNC_FLAGS_KNOWN != 0 {
        tracing::debug!(flags, "ignoring unknown vsync waiter flags");
    }
    let config = VsyncConfig::from_abi(target_fps, vsync_offset_us, flags);

    let gate: Arc<dyn TaskGate> = if gate.is_null() {
        Arc::new(NoopTaskGate)
    } else {
        Arc::new(ForeignTaskGate::from(unsafe { *gate }))
    };

    match build_waiter(&config, gate) {
        Ok((waiter, backend)) => Box::into_raw(Box::new(XianVsyncWaiter { waiter, backend })),
        Err(err) => {
            tracing::error!(%err, "failed to create vsync waiter");
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a waiter created by `xian_vsync_waiter_create`.
///
/// Pending callbacks are dropped without running; vsync signals still in flight become no-ops.
///
/// ### 中文
/// 销毁由 `xian_vsync_waiter_create` 创建的 waiter。
///
/// 未执行的回调会被丢弃；仍在途中的 vsync 信号将变为无操作。
pub unsafe extern "C" fn xian_vsync_waiter_destroy(waiter: *mut XianVsyncWaiter) {
    if waiter.is_null() {
        return;
    }
    let waiter = unsafe { Box::from_raw(waiter) };
    waiter.waiter.dispose();
    drop(waiter);
}

#[unsafe(no_mangle)]
/// ### English
/// Requests `callback` on the next vsync. A later call before that vsync replaces this callback.
///
/// Returns `false` if `waiter` or `callback` is NULL.
///
/// ### 中文
/// 请求在下一次 vsync 时调用 `callback`；在该 vsync 之前的再次调用会替换本回调。
///
/// 若 `waiter` 或 `callback` 为 NULL 则返回 `false`。
pub unsafe extern "C" fn xian_vsync_waiter_async_wait(
    waiter: *const XianVsyncWaiter,
    callback: XianVsyncFrameCallback,
    user_data: *mut c_void,
) -> bool {
    if waiter.is_null() {
        return false;
    }
    let Some(callback) = callback else {
        tracing::error!("vsync wait requested with a NULL callback");
        return false;
    };

    let user_data = UserData(user_data);
    unsafe { &*waiter }
        .waiter
        .async_wait_for_vsync(move |start, target| unsafe {
            callback(user_data.get(), start.as_nanos(), target.as_nanos());
        });
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Registers a one-shot `callback` under `id` for the next vsync (replacing any previous entry for `id`).
///
/// Returns `false` if `waiter` or `callback` is NULL.
///
/// ### 中文
/// 以 `id` 注册下一次 vsync 的一次性 `callback`（替换该 `id` 的旧记录）。
///
/// 若 `waiter` 或 `callback` 为 NULL 则返回 `false`。
pub unsafe extern "C" fn xian_vsync_waiter_schedule_secondary(
    waiter: *const XianVsyncWaiter,
    id: usize,
    callback: XianVsyncClosure,
    user_data: *mut c_void,
) -> bool {
    if waiter.is_null() {
        return false;
    }
    let Some(callback) = callback else {
        return false;
    };

    let user_data = UserData(user_data);
    unsafe { &*waiter }
        .waiter
        .schedule_secondary_callback(id, move || unsafe { callback(user_data.get()) });
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Delivers an embedder vsync to a waiter created with `target_fps == 0`.
///
/// Returns an `XIAN_VSYNC_FIRE_*` code; `XIAN_VSYNC_FIRE_INVALID` for NULL or timer-driven waiters.
/// An inverted pair (`target_ns < start_ns`) is clamped to `start_ns`.
///
/// ### 中文
/// 向以 `target_fps == 0` 创建的 waiter 送达宿主 vsync。
///
/// 返回 `XIAN_VSYNC_FIRE_*` 结果码；对 NULL 或计时驱动的 waiter 返回 `XIAN_VSYNC_FIRE_INVALID`。
/// 倒置的时间对（`target_ns < start_ns`）会被钳制为 `start_ns`。
pub unsafe extern "C" fn xian_vsync_waiter_signal(
    waiter: *const XianVsyncWaiter,
    start_ns: u64,
    target_ns: u64,
) -> u32 {
    if waiter.is_null() {
        return XIAN_VSYNC_FIRE_INVALID;
    }
    let Some(signal) = unsafe { &*waiter }.backend.compositor_signal() else {
        return XIAN_VSYNC_FIRE_INVALID;
    };
    let timings = FrameTimings::clamped(
        FrameTimePoint::from_nanos(start_ns),
        FrameTimePoint::from_nanos(target_ns),
    );
    outcome_code(signal.signal(timings))
}

#[unsafe(no_mangle)]
/// ### English
/// Fires the waiter directly, bypassing its backend (for hosts delivering vsync from a static C callback).
///
/// ### 中文
/// 绕过后端直接 fire waiter（适用于在静态 C 回调中送达 vsync 的宿主）。
pub unsafe extern "C" fn xian_vsync_waiter_fire(
    waiter: *const XianVsyncWaiter,
    start_ns: u64,
    target_ns: u64,
    pause_secondary_tasks: bool,
) -> u32 {
    if waiter.is_null() {
        return XIAN_VSYNC_FIRE_INVALID;
    }
    let outcome = unsafe { &*waiter }.waiter.fire_callback(
        FrameTimePoint::from_nanos(start_ns),
        FrameTimePoint::from_nanos(target_ns),
        pause_secondary_tasks,
    );
    outcome_code(outcome)
}
