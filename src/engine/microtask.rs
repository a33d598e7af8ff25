//! ### English
//! In-process cooperative microtask queue that implements `TaskGate`.
//!
//! The owner of the queue drains it with `run_microtasks()` from its event loop. While the gate is
//! paused (for example during a vsync fire) draining is deferred, so unrelated microtasks cannot
//! interleave with frame callbacks.
//!
//! ### 中文
//! 实现了 `TaskGate` 的进程内协作式微任务队列。
//!
//! 队列所有者在其事件循环中调用 `run_microtasks()` 进行 drain。闸门暂停期间（例如 vsync fire 时）
//! drain 会被推迟，从而避免无关微任务与帧回调交错执行。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::engine::gate::TaskGate;

/// ### English
/// One queued microtask.
///
/// ### 中文
/// 单个排队的微任务。
pub type Microtask = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// FIFO microtask queue with a nesting pause counter.
///
/// ### 中文
/// 带嵌套暂停计数的 FIFO 微任务队列。
#[derive(Default)]
pub struct MicrotaskQueue {
    /// ### English
    /// Pending tasks. The lock is never held while a task runs.
    ///
    /// ### 中文
    /// 待执行任务。执行任务时不持有锁。
    tasks: Mutex<VecDeque<Microtask>>,
    /// ### English
    /// Pause nesting depth; draining is allowed only at zero.
    ///
    /// ### 中文
    /// 暂停嵌套深度；仅为零时允许 drain。
    pause_depth: AtomicUsize,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Enqueues a microtask for the next drain.
    ///
    /// ### 中文
    /// 将微任务排入下一次 drain。
    pub fn schedule_microtask(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().push_back(Box::new(task));
    }

    /// ### English
    /// Runs queued microtasks in FIFO order until the queue is empty or the gate is paused.
    ///
    /// Tasks scheduled by running tasks are drained in the same call. Returns the number of tasks run.
    ///
    /// ### 中文
    /// 按 FIFO 顺序执行排队的微任务，直到队列为空或闸门被暂停。
    ///
    /// 执行中的任务新排入的任务也会在本次调用中 drain。返回执行的任务数。
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0usize;
        loop {
            if self.is_paused() {
                break;
            }
            let Some(task) = self.tasks.lock().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.pause_depth.load(Ordering::Acquire) != 0
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl TaskGate for MicrotaskQueue {
    fn pause_cooperative_queue(&self) {
        self.pause_depth.fetch_add(1, Ordering::AcqRel);
    }

    fn resume_cooperative_queue(&self) {
        let released = self
            .pause_depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                depth.checked_sub(1)
            });
        if released.is_err() {
            tracing::warn!("microtask queue resumed without a matching pause");
        }
    }
}
