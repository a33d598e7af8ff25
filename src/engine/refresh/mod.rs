//! ### English
//! Vsync backend implementations.
//!
//! Supports timer-driven software vsync, compositor/host-signaled vsync, and a test driver.
//!
//! ### 中文
//! Vsync 后端的实现。
//!
//! 支持计时驱动的软件 vsync、合成器/宿主信号驱动的 vsync，以及测试驱动。
mod compositor;
mod scheduler;
mod slot;
mod test_driver;
mod timer;

pub use compositor::{CompositorSignal, CompositorSignalBackend};
pub use scheduler::{FrameScheduler, ScheduledCallback};
pub use test_driver::{TestDriver, TestDriverBackend};
pub use timer::TimerBackend;
