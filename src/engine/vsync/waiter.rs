//! ### English
//! `VsyncWaiter`: arm/fire state machine shared by the rendering driver and the platform backend.
//!
//! ### 中文
//! `VsyncWaiter`：渲染驱动与平台后端共享的 arm/fire 状态机。

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::engine::gate::{GatePause, TaskGate};
use crate::engine::time::{FrameTimePoint, FrameTimings};

use super::registry::{SecondaryCallback, SecondaryCallbackRegistry};
use super::target::{FireOutcome, VsyncBackend, VsyncTarget};

/// ### English
/// Primary frame callback, invoked with `(frame_start_time, frame_target_time)`.
///
/// ### 中文
/// primary 帧回调，以 `(frame_start_time, frame_target_time)` 调用。
pub type PrimaryCallback = Box<dyn FnOnce(FrameTimePoint, FrameTimePoint) + Send + 'static>;

/// ### English
/// Observable state of a waiter.
///
/// ### 中文
/// waiter 的可观察状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaiterState {
    /// No pending primary callback.
    Idle,
    /// A primary callback is pending until the next fire.
    Armed,
    /// Torn down; waits are ignored and fires are no-ops.
    Disposed,
}

/// ### English
/// Shared mutable state, guarded by a single lock.
///
/// ### 中文
/// 由单把锁保护的共享可变状态。
#[derive(Default)]
struct WaiterShared {
    /// ### English
    /// Pending primary callback (present iff armed).
    ///
    /// ### 中文
    /// 待执行的 primary 回调（存在即为 armed）。
    primary: Option<PrimaryCallback>,
    /// ### English
    /// Secondary callbacks for the next fire.
    ///
    /// ### 中文
    /// 下一次 fire 的 secondary 回调。
    secondary: SecondaryCallbackRegistry,
    /// ### English
    /// Whether a backend `await_vsync` request is in flight.
    ///
    /// ### 中文
    /// 是否有一个后端 `await_vsync` 请求尚未 fire。
    request_outstanding: bool,
    /// ### English
    /// Generation of the most recent backend request; stamped into its `VsyncTarget`.
    ///
    /// ### 中文
    /// 最近一次后端请求的代数；写入对应的 `VsyncTarget`。
    arm_generation: u64,
    disposed: bool,
}

impl WaiterShared {
    /// ### English
    /// Marks a backend request as outstanding. Returns the generation to arm with if the caller
    /// must issue it, or `None` if a request is already in flight.
    ///
    /// ### 中文
    /// 将后端请求标记为未完成；若调用方需要实际发起请求，返回用于 arm 的代数，
    /// 若已有在途请求则返回 `None`。
    #[inline]
    fn begin_request(&mut self) -> Option<u64> {
        if std::mem::replace(&mut self.request_outstanding, true) {
            return None;
        }
        self.arm_generation = self.arm_generation.wrapping_add(1);
        Some(self.arm_generation)
    }

    /// ### English
    /// Settles the request a backend token was minted for. Returns `false` for a stale token.
    ///
    /// ### 中文
    /// 结清后端令牌对应的请求；令牌过期时返回 `false`。
    #[inline]
    fn complete_request(&mut self, generation: u64) -> bool {
        if !self.request_outstanding || self.arm_generation != generation {
            return false;
        }
        self.request_outstanding = false;
        true
    }
}

/// ### English
/// Vsync waiter for one rendering surface or engine instance.
///
/// Created behind an `Arc`; backends receive only weak `VsyncTarget` tokens. Dropping the last
/// `Arc` (or calling `dispose`) drops pending callbacks without running them.
///
/// ### 中文
/// 对应单个渲染 surface 或引擎实例的 vsync waiter。
///
/// 以 `Arc` 形式创建；后端只拿到弱引用的 `VsyncTarget` 令牌。drop 最后一个 `Arc`
///（或调用 `dispose`）会丢弃未执行的回调而不运行它们。
pub struct VsyncWaiter {
    /// ### English
    /// Arm/fire state (primary slot, secondary registry, flags).
    ///
    /// ### 中文
    /// arm/fire 状态（primary 槽、secondary 注册表、标记）。
    shared: Mutex<WaiterShared>,
    /// ### English
    /// Platform backend selected at construction.
    ///
    /// ### 中文
    /// 构造时选定的平台后端。
    backend: Box<dyn VsyncBackend>,
    /// ### English
    /// Embedded runtime's cooperative queue, paused around callbacks.
    ///
    /// ### 中文
    /// 嵌入式运行时的协作队列，回调期间暂停。
    gate: Arc<dyn TaskGate>,
    /// ### English
    /// Count of fires that delivered at least one callback (trace only).
    ///
    /// ### 中文
    /// 交付了至少一个回调的 fire 次数（仅用于 trace）。
    frame_number: AtomicU64,
    /// ### English
    /// Weak self-reference used to mint arm tokens.
    ///
    /// ### 中文
    /// 用于生成 arm 令牌的弱自引用。
    this: Weak<VsyncWaiter>,
}

impl VsyncWaiter {
    /// ### English
    /// Creates a waiter that owns `backend` and pauses `gate` around callbacks.
    ///
    /// #### Parameters
    /// - `backend`: Platform vsync source.
    /// - `gate`: Cooperative queue of the embedded runtime.
    ///
    /// ### 中文
    /// 创建持有 `backend` 的 waiter，并在回调期间暂停 `gate`。
    ///
    /// #### 参数
    /// - `backend`：平台 vsync 信号源。
    /// - `gate`：嵌入式运行时的协作队列。
    pub fn new(backend: Box<dyn VsyncBackend>, gate: Arc<dyn TaskGate>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            shared: Mutex::new(WaiterShared::default()),
            backend,
            gate,
            frame_number: AtomicU64::new(0),
            this: this.clone(),
        })
    }

    /// ### English
    /// Stores `callback` as the pending primary callback and arms the backend.
    ///
    /// Calling this while already armed replaces the pending callback: only the latest one fires.
    /// The backend is asked for a new vsync only when no request is in flight, and always outside
    /// the state lock.
    ///
    /// ### 中文
    /// 将 `callback` 存为待执行的 primary 回调并 arm 后端。
    ///
    /// 已处于 armed 状态时再次调用会替换待执行回调：只有最新的那个会 fire。
    /// 仅当没有在途请求时才会向后端请求新的 vsync，且始终在状态锁之外进行。
    pub fn async_wait_for_vsync(
        &self,
        callback: impl FnOnce(FrameTimePoint, FrameTimePoint) + Send + 'static,
    ) {
        let (replaced, arm) = {
            let mut shared = self.shared.lock();
            if shared.disposed {
                drop(shared);
                tracing::debug!("vsync wait ignored: waiter disposed");
                return;
            }
            let replaced = shared.primary.replace(Box::new(callback));
            (replaced, shared.begin_request())
        };

        if replaced.is_some() {
            tracing::debug!("multiple vsync waits in one frame interval; keeping the latest");
        }
        drop(replaced);

        if let Some(generation) = arm {
            self.arm_backend(generation);
        }
    }

    /// ### English
    /// Registers a one-shot callback for the next fire under `id`, replacing any entry with the same id.
    ///
    /// Arms the backend if no request is in flight, so the callback is delivered even when no primary
    /// wait is pending.
    ///
    /// #### Parameters
    /// - `id`: Stable per-subsystem identifier.
    /// - `callback`: Closure to run at the next fire.
    ///
    /// ### 中文
    /// 以 `id` 注册下一次 fire 的一次性回调；相同 id 的旧记录会被替换。
    ///
    /// 若没有在途请求则 arm 后端，使得即便没有 primary 等待也能交付该回调。
    ///
    /// #### 参数
    /// - `id`：每个子系统稳定的标识。
    /// - `callback`：下一次 fire 时执行的闭包。
    pub fn schedule_secondary_callback(&self, id: usize, callback: impl FnOnce() + Send + 'static) {
        let callback: SecondaryCallback = Box::new(callback);
        let (replaced, arm) = {
            let mut shared = self.shared.lock();
            if shared.disposed {
                drop(shared);
                tracing::debug!(id, "secondary vsync callback ignored: waiter disposed");
                return;
            }
            let replaced = shared.secondary.insert(id, callback);
            (replaced, shared.begin_request())
        };

        if replaced.is_some() {
            tracing::trace!(id, "secondary vsync callback replaced");
        }
        drop(replaced);

        if let Some(generation) = arm {
            self.arm_backend(generation);
        }
    }

    /// ### English
    /// Delivers a vsync: runs the pending primary callback with `(start, target)`, then every
    /// secondary callback registered before this call.
    ///
    /// Callable from any thread. An inverted pair is clamped (`target = start`) with a warning.
    /// A direct fire does not settle the backend request: a token still in flight fires at the next
    /// vsync and delivers whatever was registered after this call.
    ///
    /// #### Parameters
    /// - `start`: Frame start time.
    /// - `target`: Predicted presentation time.
    /// - `pause_secondary_tasks`: Pause the runtime task gate around the callbacks (normally `true`).
    ///
    /// ### 中文
    /// 交付一次 vsync：先以 `(start, target)` 执行待执行的 primary 回调，再执行本次调用之前注册的所有
    /// secondary 回调。
    ///
    /// 可在任意线程调用。倒置的时间对会被钳制（`target = start`）并输出警告。
    /// 直接 fire 不会结清后端请求：仍在途中的令牌会在下一次 vsync 时 fire，并交付本次调用之后注册的回调。
    ///
    /// #### 参数
    /// - `start`：帧开始时间。
    /// - `target`：预测的呈现时间。
    /// - `pause_secondary_tasks`：回调期间是否暂停运行时任务闸门（通常为 `true`）。
    pub fn fire_callback(
        &self,
        start: FrameTimePoint,
        target: FrameTimePoint,
        pause_secondary_tasks: bool,
    ) -> FireOutcome {
        let timings = FrameTimings::new(start, target).unwrap_or_else(|err| {
            tracing::warn!(%err, "clamping vsync timings");
            FrameTimings::clamped(start, target)
        });
        self.fire(timings, pause_secondary_tasks, None)
    }

    /// ### English
    /// Shared fire path. `generation` is `Some` for a backend token and `None` for a direct fire.
    ///
    /// ### 中文
    /// 公共 fire 路径。后端令牌传入 `Some(generation)`，直接 fire 传入 `None`。
    pub(crate) fn fire(
        &self,
        timings: FrameTimings,
        pause_secondary_tasks: bool,
        generation: Option<u64>,
    ) -> FireOutcome {
        let (primary, secondary) = {
            let mut shared = self.shared.lock();
            if shared.disposed {
                return FireOutcome::Disposed;
            }
            debug_assert!(
                shared.primary.is_none() || shared.request_outstanding,
                "armed waiter without an outstanding backend request"
            );
            if let Some(generation) = generation
                && !shared.complete_request(generation)
            {
                drop(shared);
                tracing::trace!(generation, "stale vsync token ignored");
                return FireOutcome::Stale;
            }
            (shared.primary.take(), shared.secondary.take_all())
        };

        let _pause = pause_secondary_tasks.then(|| GatePause::engage(&*self.gate));

        if primary.is_none() && secondary.is_empty() {
            tracing::trace!("mismatched vsync: nothing to deliver");
            return FireOutcome::Empty;
        }

        let frame_number = self.frame_number.fetch_add(1, Ordering::Relaxed) + 1;
        let secondary_count = secondary.len();
        let _span = tracing::trace_span!(
            "vsync_fire",
            frame_number,
            start_ns = timings.start().as_nanos(),
            target_ns = timings.target().as_nanos(),
            secondary = secondary_count,
        )
        .entered();

        // Every taken callback runs even if an earlier one panics; the first panic is re-raised after.
        let mut payload = None;
        let has_primary = primary.is_some();
        if let Some(primary) = primary
            && let Err(err) = panic::catch_unwind(AssertUnwindSafe(|| {
                primary(timings.start(), timings.target())
            }))
        {
            payload = Some(err);
        }
        for callback in secondary.into_callbacks() {
            if let Err(err) = panic::catch_unwind(AssertUnwindSafe(callback))
                && payload.is_none()
            {
                payload = Some(err);
            }
        }
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }

        FireOutcome::Delivered {
            primary: has_primary,
            secondary: secondary_count,
        }
    }

    /// ### English
    /// Tears the waiter down: pending callbacks are dropped unrun, later waits are ignored and later
    /// fires are no-ops.
    ///
    /// ### 中文
    /// 销毁 waiter：丢弃未执行的回调；之后的等待会被忽略，之后的 fire 为无操作。
    pub fn dispose(&self) {
        let released = {
            let mut shared = self.shared.lock();
            if shared.disposed {
                return;
            }
            shared.disposed = true;
            shared.request_outstanding = false;
            (shared.primary.take(), shared.secondary.take_all())
        };
        tracing::debug!(
            armed = released.0.is_some(),
            secondary = released.1.len(),
            "vsync waiter disposed"
        );
        drop(released);
    }

    /// ### English
    /// Current state: `Armed` while a primary callback is pending.
    ///
    /// ### 中文
    /// 当前状态：存在待执行的 primary 回调时为 `Armed`。
    pub fn state(&self) -> WaiterState {
        let shared = self.shared.lock();
        if shared.disposed {
            WaiterState::Disposed
        } else if shared.primary.is_some() {
            WaiterState::Armed
        } else {
            WaiterState::Idle
        }
    }

    /// ### English
    /// Whether a primary callback is pending.
    ///
    /// ### 中文
    /// 是否存在待执行的 primary 回调。
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.state() == WaiterState::Armed
    }

    /// ### English
    /// Whether `dispose` has been called.
    ///
    /// ### 中文
    /// 是否已调用 `dispose`。
    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// ### English
    /// Number of secondary callbacks waiting for the next fire.
    ///
    /// ### 中文
    /// 等待下一次 fire 的 secondary 回调数量。
    pub fn pending_secondary_callbacks(&self) -> usize {
        self.shared.lock().secondary.len()
    }

    /// ### English
    /// Number of fires that delivered at least one callback.
    ///
    /// ### 中文
    /// 交付了至少一个回调的 fire 次数。
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number.load(Ordering::Relaxed)
    }

    fn arm_backend(&self, generation: u64) {
        tracing::trace!(generation, "arming vsync backend");
        self.backend
            .await_vsync(VsyncTarget::new(self.this.clone(), generation));
    }
}

impl Drop for VsyncWaiter {
    fn drop(&mut self) {
        let shared = self.shared.get_mut();
        if shared.primary.is_some() {
            tracing::debug!("vsync waiter dropped while armed; pending callback discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gate::NoopTaskGate;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingBackend {
        arms: AtomicUsize,
        tokens: Mutex<Vec<VsyncTarget>>,
    }

    struct SharedBackend(Arc<RecordingBackend>);

    impl VsyncBackend for SharedBackend {
        fn await_vsync(&self, target: VsyncTarget) {
            self.0.arms.fetch_add(1, Ordering::SeqCst);
            self.0.tokens.lock().push(target);
        }
    }

    fn waiter() -> (Arc<VsyncWaiter>, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let waiter = VsyncWaiter::new(
            Box::new(SharedBackend(backend.clone())),
            Arc::new(NoopTaskGate),
        );
        (waiter, backend)
    }

    fn at(nanos: u64) -> FrameTimePoint {
        FrameTimePoint::from_nanos(nanos)
    }

    #[test]
    fn state_transitions_idle_armed_idle() {
        let (waiter, backend) = waiter();
        assert_eq!(waiter.state(), WaiterState::Idle);

        waiter.async_wait_for_vsync(|_, _| {});
        assert_eq!(waiter.state(), WaiterState::Armed);
        assert_eq!(backend.arms.load(Ordering::SeqCst), 1);

        let token = backend.tokens.lock().pop().unwrap();
        let outcome = token.fire(FrameTimings::new(at(1), at(2)).unwrap());
        assert_eq!(
            outcome,
            FireOutcome::Delivered {
                primary: true,
                secondary: 0
            }
        );
        assert_eq!(waiter.state(), WaiterState::Idle);
        assert_eq!(waiter.frame_number(), 1);
    }

    #[test]
    fn overwrite_while_armed_arms_backend_once() {
        let (waiter, backend) = waiter();
        waiter.async_wait_for_vsync(|_, _| {});
        waiter.async_wait_for_vsync(|_, _| {});
        waiter.schedule_secondary_callback(3, || {});
        assert_eq!(backend.arms.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn secondary_on_idle_waiter_arms_backend() {
        let (waiter, backend) = waiter();
        waiter.schedule_secondary_callback(1, || {});
        assert_eq!(backend.arms.load(Ordering::SeqCst), 1);
        assert_eq!(waiter.state(), WaiterState::Idle);
        assert_eq!(waiter.pending_secondary_callbacks(), 1);
    }

    #[test]
    fn fire_rearms_on_next_wait() {
        let (waiter, backend) = waiter();
        waiter.async_wait_for_vsync(|_, _| {});
        let token = backend.tokens.lock().pop().unwrap();
        assert!(token.fire(FrameTimings::new(at(0), at(16)).unwrap()).delivered());
        waiter.async_wait_for_vsync(|_, _| {});
        assert_eq!(backend.arms.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn direct_fire_leaves_backend_request_in_flight() {
        let (waiter, backend) = waiter();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        waiter.async_wait_for_vsync(move |start, _| sink.lock().push(("a", start)));
        waiter.fire_callback(at(100), at(116), true);

        let sink = seen.clone();
        waiter.async_wait_for_vsync(move |start, _| sink.lock().push(("b", start)));
        assert_eq!(backend.arms.load(Ordering::SeqCst), 1);

        let token = backend.tokens.lock().pop().unwrap();
        assert!(token.fire(FrameTimings::new(at(132), at(148)).unwrap()).delivered());
        assert_eq!(*seen.lock(), vec![("a", at(100)), ("b", at(132))]);

        waiter.async_wait_for_vsync(|_, _| {});
        assert_eq!(backend.arms.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stale_generation_token_delivers_nothing() {
        let (waiter, backend) = waiter();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_primary = ran.clone();
        waiter.async_wait_for_vsync(move |_, _| {
            ran_primary.fetch_add(1, Ordering::SeqCst);
        });

        let stale = VsyncTarget::new(Arc::downgrade(&waiter), 0);
        assert_eq!(
            stale.fire(FrameTimings::new(at(0), at(16)).unwrap()),
            FireOutcome::Stale
        );
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(waiter.is_armed());

        let token = backend.tokens.lock().pop().unwrap();
        assert!(token.fire(FrameTimings::new(at(16), at(32)).unwrap()).delivered());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inverted_timings_are_clamped() {
        let (waiter, _backend) = waiter();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        waiter.async_wait_for_vsync(move |start, target| *sink.lock() = Some((start, target)));
        waiter.fire_callback(at(50), at(10), true);
        assert_eq!(*seen.lock(), Some((at(50), at(50))));
    }

    #[test]
    fn dispose_drops_pending_and_ignores_later_calls() {
        let (waiter, backend) = waiter();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_primary = ran.clone();
        waiter.async_wait_for_vsync(move |_, _| {
            ran_primary.fetch_add(1, Ordering::SeqCst);
        });
        let token = backend.tokens.lock().pop().unwrap();
        assert!(token.is_live());

        waiter.dispose();
        assert_eq!(waiter.state(), WaiterState::Disposed);
        assert!(!token.is_live());

        waiter.async_wait_for_vsync(|_, _| {});
        waiter.schedule_secondary_callback(1, || {});
        assert_eq!(backend.arms.load(Ordering::SeqCst), 1);

        let outcome = token.fire(FrameTimings::new(at(0), at(1)).unwrap());
        assert_eq!(outcome, FireOutcome::Disposed);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn token_outliving_waiter_is_a_noop() {
        let (waiter, backend) = waiter();
        waiter.async_wait_for_vsync(|_, _| panic!("stale callback must not run"));
        let token = backend.tokens.lock().pop().unwrap();
        drop(waiter);
        assert!(!token.is_live());
        assert_eq!(
            token.fire(FrameTimings::new(at(0), at(1)).unwrap()),
            FireOutcome::WaiterGone
        );
    }

    #[test]
    fn callbacks_may_rearm_from_inside_the_fire() {
        let (waiter, backend) = waiter();
        let inner = waiter.clone();
        waiter.async_wait_for_vsync(move |_, _| {
            inner.async_wait_for_vsync(|_, _| {});
            inner.schedule_secondary_callback(9, || {});
        });
        let token = backend.tokens.lock().pop().unwrap();
        token.fire(FrameTimings::new(at(0), at(16)).unwrap());
        assert_eq!(waiter.state(), WaiterState::Armed);
        assert_eq!(waiter.pending_secondary_callbacks(), 1);
        assert_eq!(backend.arms.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn replaced_callback_drop_may_reenter_waiter() {
        struct ReenterOnDrop(Arc<VsyncWaiter>);
        impl Drop for ReenterOnDrop {
            fn drop(&mut self) {
                let _ = self.0.state();
            }
        }

        let (waiter, _backend) = waiter();
        let guard = ReenterOnDrop(waiter.clone());
        waiter.async_wait_for_vsync(move |_, _| drop(guard));
        waiter.async_wait_for_vsync(|_, _| {});
        assert!(waiter.is_armed());
    }
}
