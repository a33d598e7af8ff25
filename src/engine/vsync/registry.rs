//! ### English
//! Keyed, replace-on-reinsert, drain-once set of secondary vsync callbacks.
//!
//! ### 中文
//! 按 key 存储、重复插入即替换、仅 drain 一次的 secondary vsync 回调集合。

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

/// ### English
/// One-shot closure run at the next vsync fire.
///
/// ### 中文
/// 在下一次 vsync fire 时执行的一次性闭包。
pub type SecondaryCallback = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Hasher for `usize` callback ids (addresses or counters).
///
/// The multiply keeps the trailing zero bits of pointer-aligned ids, so `finish` folds the high
/// half back into the low bits the table uses for bucket selection.
///
/// ### 中文
/// `usize` 回调 id（地址或计数器）的哈希器。
///
/// 乘法会保留指针对齐 id 末尾的零位，因此 `finish` 把高半部分折叠回哈希表选桶所用的低位。
#[derive(Default)]
struct CallbackIdHasher(u64);

impl Hasher for CallbackIdHasher {
    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.0 = (self.0 ^ u64::from_le_bytes(buf)).rotate_left(29);
        }
    }

    fn write_usize(&mut self, i: usize) {
        self.0 = i as u64;
    }

    fn finish(&self) -> u64 {
        let mixed = self.0.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        mixed ^ (mixed >> 32)
    }
}

type CallbackIdMap<V> = HashMap<usize, V, BuildHasherDefault<CallbackIdHasher>>;

/// ### English
/// Secondary callback registry owned by a `VsyncWaiter`.
///
/// The map size is bounded by the number of distinct ids, because every id holds at most one entry
/// and the whole map is swapped out at each fire.
///
/// ### 中文
/// 由 `VsyncWaiter` 持有的 secondary 回调注册表。
///
/// 每个 id 至多一条记录，且每次 fire 会整体换出，因此大小受不同 id 数量约束。
#[derive(Default)]
pub struct SecondaryCallbackRegistry {
    callbacks: CallbackIdMap<SecondaryCallback>,
}

impl SecondaryCallbackRegistry {
    /// ### English
    /// Creates an empty registry.
    ///
    /// ### 中文
    /// 创建空的注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// ### English
    /// Inserts `callback` under `id`, returning the callback it replaced (if any).
    ///
    /// The replaced callback is handed back instead of dropped so the caller can release it
    /// outside any lock.
    ///
    /// #### Parameters
    /// - `id`: Caller-chosen stable identifier.
    /// - `callback`: Closure to run at the next fire.
    ///
    /// ### 中文
    /// 以 `id` 插入 `callback`，返回被替换的旧回调（如有）。
    ///
    /// 旧回调被交还而非直接 drop，以便调用方在锁外释放它。
    ///
    /// #### 参数
    /// - `id`：调用方选定的稳定标识。
    /// - `callback`：在下一次 fire 时执行的闭包。
    pub fn insert(&mut self, id: usize, callback: SecondaryCallback) -> Option<SecondaryCallback> {
        self.callbacks.insert(id, callback)
    }

    /// ### English
    /// Moves every entry out, leaving this registry empty.
    ///
    /// ### 中文
    /// 取出全部记录，使本注册表变为空。
    pub fn take_all(&mut self) -> Self {
        std::mem::take(self)
    }

    /// ### English
    /// Whether a callback is registered under `id`.
    ///
    /// ### 中文
    /// `id` 下是否已注册回调。
    pub fn contains(&self, id: usize) -> bool {
        self.callbacks.contains_key(&id)
    }

    /// ### English
    /// Number of registered callbacks (at most one per id).
    ///
    /// ### 中文
    /// 已注册回调的数量（每个 id 至多一个）。
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// ### English
    /// Consumes the registry, yielding the callbacks in unspecified order.
    ///
    /// ### 中文
    /// 消耗注册表，以未指定顺序产出回调。
    pub fn into_callbacks(self) -> impl Iterator<Item = SecondaryCallback> {
        self.callbacks.into_values()
    }
}
