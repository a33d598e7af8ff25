//! ### English
//! Frame clocks: produce the `(start, target)` pair for the next vsync.
//!
//! ### 中文
//! 帧时钟：为下一次 vsync 产生 `(start, target)` 时间对。

use std::time::Duration;

use crate::engine::error::{VsyncError, VsyncResult};
use crate::engine::time::{FrameTimePoint, FrameTimings};

/// ### English
/// Source of frame timing predictions.
///
/// ### 中文
/// 帧时间预测的来源。
pub trait FrameClock: Send + Sync {
    /// ### English
    /// Returns the timings of the first frame whose start is not earlier than `now`.
    ///
    /// ### 中文
    /// 返回开始时间不早于 `now` 的第一帧的时间对。
    fn next_frame(&self, now: FrameTimePoint) -> FrameTimings;
}

/// ### English
/// Fixed-refresh clock with frame boundaries on the grid `offset + k * interval`.
///
/// The grid is anchored at the origin of the `FrameTimePoint` domain, so every clock with the same
/// interval and offset agrees on the boundaries.
///
/// ### 中文
/// 固定刷新率时钟，帧边界位于 `offset + k * interval` 网格上。
///
/// 网格锚定在 `FrameTimePoint` 时钟域的原点，因此相同间隔与偏移的时钟得到相同的边界。
#[derive(Clone, Copy, Debug)]
pub struct FixedRefreshClock {
    /// ### English
    /// Refresh interval in nanoseconds (never zero).
    ///
    /// ### 中文
    /// 刷新间隔（纳秒，非零）。
    interval_ns: u64,
    /// ### English
    /// Phase of the grid, reduced modulo the interval.
    ///
    /// ### 中文
    /// 网格相位（已对间隔取模）。
    phase_ns: u64,
}

impl FixedRefreshClock {
    /// ### English
    /// Creates a clock from an explicit refresh interval and vsync offset.
    ///
    /// A zero interval is rejected as `InvalidRefreshRate(0)`.
    ///
    /// #### Parameters
    /// - `interval`: Time between two vsync boundaries.
    /// - `offset`: Phase shift applied to every boundary.
    ///
    /// ### 中文
    /// 由显式刷新间隔与 vsync 偏移创建时钟。
    ///
    /// 间隔为零时返回 `InvalidRefreshRate(0)`。
    ///
    /// #### 参数
    /// - `interval`：两次 vsync 边界之间的时长。
    /// - `offset`：施加在每个边界上的相位偏移。
    pub fn new(interval: Duration, offset: Duration) -> VsyncResult<Self> {
        let interval_ns = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
        if interval_ns == 0 {
            return Err(VsyncError::InvalidRefreshRate(0));
        }
        let offset_ns = u64::try_from(offset.as_nanos()).unwrap_or(u64::MAX);
        Ok(Self {
            interval_ns,
            phase_ns: offset_ns % interval_ns,
        })
    }

    /// ### English
    /// Creates a clock for `fps` frames per second.
    ///
    /// ### 中文
    /// 为每秒 `fps` 帧创建时钟。
    pub fn from_fps(fps: u32, offset: Duration) -> VsyncResult<Self> {
        if fps == 0 {
            return Err(VsyncError::InvalidRefreshRate(fps));
        }
        Self::new(Duration::from_nanos(1_000_000_000 / u64::from(fps)), offset)
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns)
    }
}

impl FrameClock for FixedRefreshClock {
    fn next_frame(&self, now: FrameTimePoint) -> FrameTimings {
        let now_ns = now.as_nanos();
        let start_ns = if now_ns <= self.phase_ns {
            self.phase_ns
        } else {
            let since_phase = now_ns - self.phase_ns;
            let periods = since_phase.div_ceil(self.interval_ns);
            self.phase_ns
                .saturating_add(periods.saturating_mul(self.interval_ns))
        };
        let start = FrameTimePoint::from_nanos(start_ns);
        let target = FrameTimePoint::from_nanos(start_ns.saturating_add(self.interval_ns));
        FrameTimings::clamped(start, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(interval_ns: u64, offset_ns: u64) -> FixedRefreshClock {
        FixedRefreshClock::new(
            Duration::from_nanos(interval_ns),
            Duration::from_nanos(offset_ns),
        )
        .unwrap()
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(matches!(
            FixedRefreshClock::from_fps(0, Duration::ZERO),
            Err(VsyncError::InvalidRefreshRate(0))
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(FixedRefreshClock::new(Duration::ZERO, Duration::ZERO).is_err());
    }

    #[test]
    fn sixty_fps_interval() {
        let clock = FixedRefreshClock::from_fps(60, Duration::ZERO).unwrap();
        assert_eq!(clock.interval(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn boundary_is_returned_unchanged() {
        let timings = clock(16, 0).next_frame(FrameTimePoint::from_nanos(32));
        assert_eq!(timings.start().as_nanos(), 32);
        assert_eq!(timings.target().as_nanos(), 48);
    }

    #[test]
    fn rounds_up_to_next_boundary() {
        let timings = clock(16, 0).next_frame(FrameTimePoint::from_nanos(33));
        assert_eq!(timings.start().as_nanos(), 48);
        assert_eq!(timings.budget(), Duration::from_nanos(16));
    }

    #[test]
    fn offset_shifts_the_grid() {
        let clock = clock(16, 4);
        assert_eq!(clock.next_frame(FrameTimePoint::from_nanos(0)).start().as_nanos(), 4);
        assert_eq!(clock.next_frame(FrameTimePoint::from_nanos(5)).start().as_nanos(), 20);
        assert_eq!(clock.next_frame(FrameTimePoint::from_nanos(20)).start().as_nanos(), 20);
    }

    #[test]
    fn offset_larger_than_interval_wraps() {
        let a = clock(16, 4).next_frame(FrameTimePoint::from_nanos(100));
        let b = clock(16, 36).next_frame(FrameTimePoint::from_nanos(100));
        assert_eq!(a, b);
    }

    #[test]
    fn start_never_precedes_now() {
        let clock = clock(7, 3);
        for now in 0..200 {
            let timings = clock.next_frame(FrameTimePoint::from_nanos(now));
            assert!(timings.start().as_nanos() >= now);
            assert!(timings.start().as_nanos() < now + 7);
        }
    }
}
