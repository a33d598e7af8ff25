//! ### English
//! Runtime task gate: pauses the embedded runtime's cooperative queue around frame callbacks.
//!
//! ### 中文
//! 运行时任务闸门：在帧回调期间暂停嵌入式运行时的协作队列。

use std::sync::Arc;

/// ### English
/// Cooperative task queue collaborator injected into the vsync waiter.
///
/// Both calls must be non-blocking, and must be harmless when the runtime has no active
/// cooperative queue.
///
/// ### 中文
/// 注入到 vsync waiter 的协作任务队列协作者。
///
/// 两个调用都不得阻塞；当运行时没有活动的协作队列时应为无操作。
pub trait TaskGate: Send + Sync {
    fn pause_cooperative_queue(&self);
    fn resume_cooperative_queue(&self);
}

/// ### English
/// Gate for runtimes without a cooperative queue.
///
/// ### 中文
/// 用于没有协作队列的运行时。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTaskGate;

impl TaskGate for NoopTaskGate {
    #[inline]
    fn pause_cooperative_queue(&self) {}

    #[inline]
    fn resume_cooperative_queue(&self) {}
}

impl<G: TaskGate + ?Sized> TaskGate for Arc<G> {
    #[inline]
    fn pause_cooperative_queue(&self) {
        (**self).pause_cooperative_queue();
    }

    #[inline]
    fn resume_cooperative_queue(&self) {
        (**self).resume_cooperative_queue();
    }
}

/// ### English
/// Scoped pause of a `TaskGate`.
///
/// `engage()` pauses the queue; dropping the guard resumes it. The resume also runs while
/// unwinding out of a panicking callback.
///
/// ### 中文
/// `TaskGate` 的作用域暂停守卫。
///
/// `engage()` 暂停队列；守卫 drop 时恢复。回调 panic 展开时同样会执行恢复。
#[must_use = "dropping the guard resumes the cooperative queue immediately"]
pub struct GatePause<'a> {
    gate: &'a dyn TaskGate,
}

impl<'a> GatePause<'a> {
    /// ### English
    /// Pauses `gate` until the returned guard is dropped.
    ///
    /// ### 中文
    /// 暂停 `gate`，直到返回的守卫被 drop。
    pub fn engage(gate: &'a dyn TaskGate) -> Self {
        gate.pause_cooperative_queue();
        Self { gate }
    }
}

impl Drop for GatePause<'_> {
    fn drop(&mut self) {
        self.gate.resume_cooperative_queue();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingGate {
        paused: AtomicUsize,
        resumed: AtomicUsize,
    }

    impl TaskGate for CountingGate {
        fn pause_cooperative_queue(&self) {
            self.paused.fetch_add(1, Ordering::SeqCst);
        }

        fn resume_cooperative_queue(&self) {
            self.resumed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_pauses_then_resumes() {
        let gate = CountingGate::default();
        {
            let _pause = GatePause::engage(&gate);
            assert_eq!(gate.paused.load(Ordering::SeqCst), 1);
            assert_eq!(gate.resumed.load(Ordering::SeqCst), 0);
        }
        assert_eq!(gate.resumed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_resumes_on_panic() {
        let gate = CountingGate::default();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _pause = GatePause::engage(&gate);
            panic!("frame callback failed");
        }));
        assert!(result.is_err());
        assert_eq!(gate.paused.load(Ordering::SeqCst), 1);
        assert_eq!(gate.resumed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_forwards_to_inner_gate() {
        let gate = Arc::new(CountingGate::default());
        let shared: Arc<dyn TaskGate> = gate.clone();
        drop(GatePause::engage(&shared));
        assert_eq!(gate.paused.load(Ordering::SeqCst), 1);
        assert_eq!(gate.resumed.load(Ordering::SeqCst), 1);
    }
}
