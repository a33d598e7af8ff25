//! ### English
//! Shared deadline scheduler backing timer-driven vsync (single worker thread).
//!
//! ### 中文
//! 计时驱动 vsync 所用的共享 deadline 调度器（单工作线程）。

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;

use crate::engine::error::{VsyncError, VsyncResult};

/// ### English
/// One-shot task executed on the scheduler thread.
///
/// ### 中文
/// 在调度线程上执行的一次性任务。
pub type ScheduledCallback = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// One scheduled callback stored in the deadline heap.
///
/// `BinaryHeap` is a max-heap, so `Ord` is reversed to pop the earliest deadline first.
///
/// ### 中文
/// 存储在 deadline 堆中的单个调度任务。
///
/// `BinaryHeap` 是最大堆，因此 `Ord` 取反以便先弹出最早的 deadline。
struct ScheduledTask {
    deadline: Instant,
    /// ### English
    /// Submission order; tiebreaker for equal deadlines.
    ///
    /// ### 中文
    /// 提交顺序；deadline 相同时的平局判定。
    seq: u64,
    callback: ScheduledCallback,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.deadline.cmp(&self.deadline) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

enum SchedulerMsg {
    Schedule(ScheduledTask),
    Shutdown,
}

/// ### English
/// Deadline scheduler shared by every timer backend of a process (avoids one timer thread per
/// surface).
///
/// ### 中文
/// 进程内所有计时后端共享的 deadline 调度器（避免每个 surface 一个计时线程）。
pub struct FrameScheduler {
    /// ### English
    /// Inbox of the scheduler thread.
    ///
    /// ### 中文
    /// 调度线程的收件队列。
    tx: channel::Sender<SchedulerMsg>,
    next_seq: AtomicU64,
    /// ### English
    /// Worker thread handle, used to skip the join when dropped on the worker itself.
    ///
    /// ### 中文
    /// 工作线程句柄；在工作线程自身上 drop 时用于跳过 join。
    thread: thread::Thread,
    join: Option<thread::JoinHandle<()>>,
}

impl FrameScheduler {
    /// ### English
    /// Spawns the scheduler worker thread.
    ///
    /// ### 中文
    /// 创建调度工作线程。
    pub fn new() -> VsyncResult<Arc<Self>> {
        let (tx, rx) = channel::unbounded::<SchedulerMsg>();
        let join = thread::Builder::new()
            .name("XianVsyncScheduler".to_string())
            .spawn(move || run_scheduler(rx))
            .map_err(VsyncError::SchedulerSpawn)?;
        let thread = join.thread().clone();

        Ok(Arc::new(Self {
            tx,
            next_seq: AtomicU64::new(1),
            thread,
            join: Some(join),
        }))
    }

    /// ### English
    /// Schedules `callback` to run once after `delay`.
    ///
    /// ### 中文
    /// 计划在 `delay` 之后执行一次 `callback`。
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) {
        self.schedule_at(Instant::now() + delay, callback);
    }

    /// ### English
    /// Schedules `callback` to run once at `deadline` (immediately if it already passed).
    ///
    /// ### 中文
    /// 计划在 `deadline` 执行一次 `callback`（若已过期则立即执行）。
    pub fn schedule_at(&self, deadline: Instant, callback: impl FnOnce() + Send + 'static) {
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let task = ScheduledTask {
            deadline,
            seq,
            callback: Box::new(callback),
        };
        if self.tx.send(SchedulerMsg::Schedule(task)).is_err() {
            tracing::warn!("frame scheduler thread is gone; task dropped");
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(SchedulerMsg::Shutdown);
        if let Some(join) = self.join.take()
            && thread::current().id() != self.thread.id()
        {
            let _ = join.join();
        }
    }
}

/// ### English
/// Scheduler thread main loop. Pending tasks are dropped unrun on shutdown.
///
/// ### 中文
/// 调度线程主循环。关闭时未执行的任务会被直接丢弃。
fn run_scheduler(rx: channel::Receiver<SchedulerMsg>) {
    let mut queue: BinaryHeap<ScheduledTask> = BinaryHeap::new();

    loop {
        let now = Instant::now();
        while queue.peek().is_some_and(|next| next.deadline <= now) {
            let Some(task) = queue.pop() else {
                break;
            };
            if catch_unwind(AssertUnwindSafe(task.callback)).is_err() {
                tracing::error!(seq = task.seq, "scheduled vsync task panicked");
            }
        }

        let timeout = queue
            .peek()
            .map(|task| task.deadline.saturating_duration_since(Instant::now()));

        let msg = match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(msg) => msg,
                Err(channel::RecvTimeoutError::Timeout) => continue,
                Err(channel::RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(msg) => msg,
                Err(channel::RecvError) => return,
            },
        };

        match msg {
            SchedulerMsg::Schedule(task) => queue.push(task),
            SchedulerMsg::Shutdown => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_tasks_in_deadline_order() {
        let scheduler = FrameScheduler::new().unwrap();
        let (tx, rx) = channel::unbounded();
        let base = Instant::now() + Duration::from_millis(20);
        for (label, offset_ms) in [("c", 10u64), ("a", 0), ("b", 5)] {
            let tx = tx.clone();
            scheduler.schedule_at(base + Duration::from_millis(offset_ms), move || {
                let _ = tx.send(label);
            });
        }
        let order: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_deadlines_keep_submission_order() {
        let scheduler = FrameScheduler::new().unwrap();
        let (tx, rx) = channel::unbounded();
        let deadline = Instant::now() + Duration::from_millis(10);
        for i in 0..4 {
            let tx = tx.clone();
            scheduler.schedule_at(deadline, move || {
                let _ = tx.send(i);
            });
        }
        let order: Vec<_> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn panicking_task_does_not_stop_the_worker() {
        let scheduler = FrameScheduler::new().unwrap();
        let (tx, rx) = channel::unbounded();
        scheduler.schedule(Duration::ZERO, || panic!("task failure"));
        scheduler.schedule(Duration::from_millis(1), move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn drop_on_worker_thread_does_not_deadlock() {
        let (tx, rx) = channel::unbounded();
        let slot = Arc::new(parking_lot::Mutex::new(Some(FrameScheduler::new().unwrap())));
        let slot_for_task = slot.clone();
        let scheduler = slot.lock().as_ref().unwrap().clone();
        scheduler.schedule(Duration::from_millis(20), move || {
            drop(slot_for_task.lock().take());
            let _ = tx.send(());
        });
        drop(scheduler);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
