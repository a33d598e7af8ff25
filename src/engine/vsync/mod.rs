//! ### English
//! Vsync waiter: turns an asynchronous platform vsync signal into exactly one primary frame
//! callback per armed wait, plus keyed one-shot secondary callbacks drained at the same fire.
//!
//! Threading model:
//! - Any thread may wait or schedule secondary callbacks.
//! - Backends fire from their own thread (timer worker, compositor event thread, host tick).
//! - The state lock is held only to swap state; callbacks always run outside it.
//!
//! ### 中文
//! Vsync waiter：把异步的平台 vsync 信号转换为每次 arm 恰好一次的 primary 帧回调，
//! 并在同一次 fire 中 drain 按 key 存储的一次性 secondary 回调。
//!
//! 线程模型：
//! - 任意线程都可以等待或注册 secondary 回调。
//! - 后端在自己的线程上 fire（计时工作线程、合成器事件线程、宿主 tick）。
//! - 状态锁只在交换状态时持有；回调始终在锁外执行。
mod registry;
mod target;
mod waiter;

pub use registry::{SecondaryCallback, SecondaryCallbackRegistry};
pub use target::{FireOutcome, VsyncBackend, VsyncTarget};
pub use waiter::{PrimaryCallback, VsyncWaiter, WaiterState};
