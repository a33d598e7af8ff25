//! ### English
//! Lock-free latest-wins slot used to park one arm token for an external signal source.
//!
//! ### 中文
//! 无锁的“只保留最新值”槽位，用于为外部信号源暂存一个 arm 令牌。

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// ### English
/// Atomic `Option<Box<T>>` with swap semantics.
///
/// - Any thread may `park` or `take`; both are a single atomic swap, so an interrupt-like signal
///   thread never blocks on the waiter's threads.
/// - `park` hands back the value it displaced so the caller decides how to release it.
///
/// ### 中文
/// 具有 swap 语义的原子 `Option<Box<T>>`。
///
/// - 任意线程均可 `park` 或 `take`；两者都是一次原子 swap，信号线程不会因 waiter 线程而阻塞。
/// - `park` 会交还被替换的旧值，由调用方决定如何释放。
pub(crate) struct LatestSlot<T> {
    ptr: AtomicPtr<T>,
}

unsafe impl<T: Send> Send for LatestSlot<T> {}
unsafe impl<T: Send> Sync for LatestSlot<T> {}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl<T> LatestSlot<T> {
    #[inline]
    pub(crate) fn is_parked(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    #[inline]
    pub(crate) fn park(&self, value: T) -> Option<T> {
        let new_ptr = Box::into_raw(Box::new(value));
        let old_ptr = self.ptr.swap(new_ptr, Ordering::AcqRel);
        unsafe { Self::reclaim(old_ptr) }
    }

    #[inline]
    pub(crate) fn take(&self) -> Option<T> {
        let old_ptr = self.ptr.swap(ptr::null_mut(), Ordering::AcqRel);
        unsafe { Self::reclaim(old_ptr) }
    }

    /// ### English
    /// Takes back ownership of a pointer previously produced by `Box::into_raw` in `park`.
    ///
    /// # Safety
    /// `raw` must be null or a pointer swapped out of `self.ptr` (owned exclusively by the caller).
    ///
    /// ### 中文
    /// 收回由 `park` 中 `Box::into_raw` 产生的指针的所有权。
    ///
    /// # Safety
    /// `raw` 必须为空，或是从 `self.ptr` 中 swap 出来、由调用方独占的指针。
    #[inline]
    unsafe fn reclaim(raw: *mut T) -> Option<T> {
        if raw.is_null() {
            None
        } else {
            Some(*unsafe { Box::from_raw(raw) })
        }
    }
}

impl<T> Drop for LatestSlot<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}
