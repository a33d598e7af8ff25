//! ### English
//! Monotonic frame timestamps and the `(start, target)` pair delivered on every vsync.
//!
//! ### 中文
//! 单调帧时间戳，以及每次 vsync 交付的 `(start, target)` 时间对。

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::engine::error::{VsyncError, VsyncResult};

/// ### English
/// Process-wide epoch for `FrameTimePoint::now()`.
///
/// ### 中文
/// `FrameTimePoint::now()` 使用的进程级起点。
static MONOTONIC_EPOCH: OnceLock<Instant> = OnceLock::new();

/// ### English
/// A point on a monotonic clock, in nanoseconds.
///
/// Values produced by `now()` are measured from a process-wide epoch. Values received over the C ABI
/// use whatever monotonic domain the embedder uses; both timestamps of one fire must share a domain.
///
/// ### 中文
/// 单调时钟上的一个时间点（纳秒）。
///
/// `now()` 产生的值以进程级起点为基准；通过 C ABI 传入的值使用宿主自己的单调时钟域，
/// 同一次 fire 的两个时间戳必须来自同一时钟域。
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameTimePoint(u64);

impl FrameTimePoint {
    /// ### English
    /// Creates a time point from raw nanoseconds.
    ///
    /// ### 中文
    /// 由原始纳秒值创建时间点。
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// ### English
    /// Current time on the process-wide monotonic clock.
    ///
    /// ### 中文
    /// 进程级单调时钟上的当前时间。
    pub fn now() -> Self {
        let epoch = *MONOTONIC_EPOCH.get_or_init(Instant::now);
        Self::from_duration(epoch.elapsed())
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_duration(duration: Duration) -> Self {
        Self(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        Duration::from_nanos(self.0)
    }

    /// ### English
    /// Adds `duration`, saturating at `u64::MAX` nanoseconds.
    ///
    /// ### 中文
    /// 加上 `duration`，在 `u64::MAX` 纳秒处饱和。
    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(nanos))
    }

    /// ### English
    /// Duration from `earlier` to `self`, or zero if `earlier` is later.
    ///
    /// ### 中文
    /// 从 `earlier` 到 `self` 的时长；若 `earlier` 更晚则为零。
    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Debug for FrameTimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// ### English
/// Timing pair delivered to frame callbacks.
///
/// Invariant: `target >= start`.
///
/// ### 中文
/// 交付给帧回调的时间对。
///
/// 不变量：`target >= start`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTimings {
    start: FrameTimePoint,
    target: FrameTimePoint,
}

impl FrameTimings {
    /// ### English
    /// Validates and creates a timing pair.
    ///
    /// #### Parameters
    /// - `start`: When the frame work should begin.
    /// - `target`: Predicted presentation time of the frame.
    ///
    /// ### 中文
    /// 校验并创建时间对。
    ///
    /// #### 参数
    /// - `start`：帧工作应当开始的时间。
    /// - `target`：预测的帧呈现时间。
    pub fn new(start: FrameTimePoint, target: FrameTimePoint) -> VsyncResult<Self> {
        if target < start {
            return Err(VsyncError::InvertedFrameTimings {
                start_ns: start.as_nanos(),
                target_ns: target.as_nanos(),
            });
        }
        Ok(Self { start, target })
    }

    /// ### English
    /// Creates a timing pair, clamping an inverted `target` up to `start`.
    ///
    /// ### 中文
    /// 创建时间对；若 `target` 早于 `start`，则将其钳制为 `start`。
    pub fn clamped(start: FrameTimePoint, target: FrameTimePoint) -> Self {
        Self {
            start,
            target: target.max(start),
        }
    }

    #[inline]
    pub fn start(&self) -> FrameTimePoint {
        self.start
    }

    #[inline]
    pub fn target(&self) -> FrameTimePoint {
        self.target
    }

    /// ### English
    /// Time budget between frame start and the predicted presentation.
    ///
    /// ### 中文
    /// 帧开始到预测呈现时刻之间的时间预算。
    #[inline]
    pub fn budget(&self) -> Duration {
        self.target.saturating_duration_since(self.start)
    }
}
