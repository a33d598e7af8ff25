//! ### English
//! Waiter configuration and the config-driven construction entry point.
//!
//! `target_fps == 0` selects compositor/host-signaled vsync; any other value selects the
//! fixed-interval timer backend.
//!
//! ### 中文
//! waiter 配置以及基于配置的构造入口。
//!
//! `target_fps == 0` 选择合成器/宿主信号驱动的 vsync；其它值选择固定间隔的计时后端。

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::clock::FixedRefreshClock;
use crate::engine::error::VsyncResult;
use crate::engine::flags::XIAN_VSYNC_FLAG_NO_PAUSE_SECONDARY_TASKS;
use crate::engine::gate::TaskGate;
use crate::engine::refresh::{CompositorSignal, CompositorSignalBackend, FrameScheduler, TimerBackend};
use crate::engine::vsync::{VsyncBackend, VsyncWaiter};

/// ### English
/// Vsync waiter configuration (loaded once at startup).
///
/// ### 中文
/// vsync waiter 配置（启动时加载一次）。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VsyncConfig {
    /// ### English
    /// Software refresh rate; `0` means the embedder signals vsync.
    ///
    /// ### 中文
    /// 软件刷新率；`0` 表示由宿主发出 vsync 信号。
    pub target_fps: u32,
    /// ### English
    /// Phase offset of the timer grid, in microseconds.
    ///
    /// ### 中文
    /// 计时网格的相位偏移（微秒）。
    pub vsync_offset_us: u64,
    /// ### English
    /// Pause the runtime task gate around vsync callbacks.
    ///
    /// ### 中文
    /// vsync 回调期间是否暂停运行时任务闸门。
    pub pause_secondary_tasks: bool,
}

impl Default for VsyncConfig {
    fn default() -> Self {
        Self {
            target_fps: 0,
            vsync_offset_us: 0,
            pause_secondary_tasks: true,
        }
    }
}

impl VsyncConfig {
    /// ### English
    /// Parses a TOML document; missing keys take their defaults.
    ///
    /// ### 中文
    /// 解析 TOML 文档；缺失的键使用默认值。
    pub fn from_toml_str(source: &str) -> VsyncResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// ### English
    /// Builds a config from C ABI arguments.
    ///
    /// #### Parameters
    /// - `target_fps`: Software refresh rate (`0` = embedder-signaled).
    /// - `vsync_offset_us`: Timer grid phase offset in microseconds.
    /// - `flags`: `XIAN_VSYNC_FLAG_*` bitmask.
    ///
    /// ### 中文
    /// 由 C ABI 参数构建配置。
    ///
    /// #### 参数
    /// - `target_fps`：软件刷新率（`0` 表示由宿主发信号）。
    /// - `vsync_offset_us`：计时网格相位偏移（微秒）。
    /// - `flags`：`XIAN_VSYNC_FLAG_*` 位掩码。
    pub fn from_abi(target_fps: u32, vsync_offset_us: u64, flags: u32) -> Self {
        Self {
            target_fps,
            vsync_offset_us,
            pause_secondary_tasks: flags & XIAN_VSYNC_FLAG_NO_PAUSE_SECONDARY_TASKS == 0,
        }
    }

    #[inline]
    pub fn vsync_offset(&self) -> Duration {
        Duration::from_micros(self.vsync_offset_us)
    }
}

/// ### English
/// Embedder-side handle of the backend chosen by `build_waiter`.
///
/// ### 中文
/// `build_waiter` 所选后端在宿主侧的句柄。
#[derive(Clone)]
pub enum BackendHandle {
    /// ### English
    /// Timer backend; the scheduler can be reused for more waiters.
    ///
    /// ### 中文
    /// 计时后端；调度器可复用于更多 waiter。
    Timer(Arc<FrameScheduler>),
    /// ### English
    /// Compositor backend; the embedder delivers vsync through this handle.
    ///
    /// ### 中文
    /// 合成器后端；宿主通过该句柄送达 vsync。
    CompositorSignal(CompositorSignal),
}

impl BackendHandle {
    pub fn compositor_signal(&self) -> Option<&CompositorSignal> {
        match self {
            Self::CompositorSignal(signal) => Some(signal),
            Self::Timer(_) => None,
        }
    }
}

/// ### English
/// Builds a waiter and its backend from `config`, spawning a new scheduler thread if needed.
///
/// ### 中文
/// 依据 `config` 构建 waiter 及其后端；必要时创建新的调度线程。
pub fn build_waiter(
    config: &VsyncConfig,
    gate: Arc<dyn TaskGate>,
) -> VsyncResult<(Arc<VsyncWaiter>, BackendHandle)> {
    build_waiter_with_scheduler(config, gate, None)
}

/// ### English
/// Same as `build_waiter`, reusing `scheduler` for the timer backend when provided.
///
/// ### 中文
/// 与 `build_waiter` 相同；若提供 `scheduler`，计时后端会复用它。
pub fn build_waiter_with_scheduler(
    config: &VsyncConfig,
    gate: Arc<dyn TaskGate>,
    scheduler: Option<Arc<FrameScheduler>>,
) -> VsyncResult<(Arc<VsyncWaiter>, BackendHandle)> {
    let (backend, handle): (Box<dyn VsyncBackend>, BackendHandle) = if config.target_fps == 0 {
        let (backend, signal) = CompositorSignalBackend::new();
        let signal = signal.with_pause_secondary_tasks(config.pause_secondary_tasks);
        (Box::new(backend), BackendHandle::CompositorSignal(signal))
    } else {
        let clock = FixedRefreshClock::from_fps(config.target_fps, config.vsync_offset())?;
        let scheduler = match scheduler {
            Some(scheduler) => scheduler,
            None => FrameScheduler::new()?,
        };
        let backend = TimerBackend::new(scheduler.clone(), clock)
            .with_pause_secondary_tasks(config.pause_secondary_tasks);
        (Box::new(backend), BackendHandle::Timer(scheduler))
    };

    tracing::debug!(
        target_fps = config.target_fps,
        vsync_offset_us = config.vsync_offset_us,
        pause_secondary_tasks = config.pause_secondary_tasks,
        "vsync waiter created"
    );
    Ok((VsyncWaiter::new(backend, gate), handle))
}
