//! ### English
//! Error types for fallible construction paths.
//!
//! The arm/fire hot paths are infallible; only setup (clock, scheduler thread, config) can fail.
//!
//! ### 中文
//! 可失败的构造路径所使用的错误类型。
//!
//! arm/fire 热路径不会失败；只有初始化（时钟、调度线程、配置）可能出错。

use thiserror::Error;

/// ### English
/// Errors produced while building a vsync waiter or its backends.
///
/// ### 中文
/// 构建 vsync waiter 及其后端时产生的错误。
#[derive(Error, Debug)]
pub enum VsyncError {
    /// ### English
    /// A refresh rate of zero frames per second cannot drive a fixed-interval clock.
    ///
    /// ### 中文
    /// 0 fps 无法驱动固定间隔时钟。
    #[error("invalid refresh rate: {0} fps")]
    InvalidRefreshRate(u32),

    /// ### English
    /// The frame target time precedes the frame start time.
    ///
    /// ### 中文
    /// 帧目标时间早于帧开始时间。
    #[error("frame target time {target_ns}ns precedes frame start time {start_ns}ns")]
    InvertedFrameTimings {
        /// Frame start time in nanoseconds.
        start_ns: u64,
        /// Frame target time in nanoseconds.
        target_ns: u64,
    },

    /// ### English
    /// The frame scheduler worker thread could not be spawned.
    ///
    /// ### 中文
    /// 无法创建帧调度工作线程。
    #[error("failed to spawn frame scheduler thread")]
    SchedulerSpawn(#[source] std::io::Error),

    /// ### English
    /// The TOML configuration could not be parsed.
    ///
    /// ### 中文
    /// 无法解析 TOML 配置。
    #[error("invalid vsync configuration")]
    Config(#[from] toml::de::Error),
}

/// ### English
/// Result alias for vsync setup operations.
///
/// ### 中文
/// vsync 初始化操作的 Result 别名。
pub type VsyncResult<T> = Result<T, VsyncError>;
