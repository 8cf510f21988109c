//! The G/C facade: a deferred-destruction pipeline layered on [`crate::ebr`].
//!
//! Producers call [`GcInstance::limbo`] to hand off a retired object; a
//! single drainer calls [`GcCycle::cycle`] (or [`GcCycle::full`] to block
//! until everything is reclaimed) to promote limbo entries into per-epoch
//! buckets and invoke the reclaim callback once a bucket's epoch becomes
//! safe to drain.

use crate::ebr::{EbrInstance, EbrReader, EbrSync, EBR_EPOCHS};
use crate::list::{Linked, LimboStack};
use crate::sync::{Arc, AtomicPtr, Cell, Ordering};
use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

/// The linkage node embedded inside every object the G/C facade manages.
/// The library never interprets the bytes of the user object itself, only
/// this node's `next` field, to walk reclaim chains.
///
/// 嵌入在 G/C 外观层管理的每个对象内部的链接节点。本库从不解释
/// 用户对象本身的字节内容，只使用该节点的 `next` 字段来遍历
/// 待回收链。
pub struct GcNode {
    pub next: AtomicPtr<GcNode>,
}

impl GcNode {
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl Default for GcNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Linked for GcNode {
    fn next_ptr(&self) -> &AtomicPtr<Self> {
        &self.next
    }
}

/// A convenience wrapper placing a [`GcNode`] as the first field of a
/// `#[repr(C)]` struct, so the common `entry_offset == 0` case needs no
/// unsafe offset arithmetic from the caller. Use [`GcInstance::create`] with
/// `entry_offset = 0` when retiring `GcBox<T>` values.
///
/// 一个便利包装类型，将 [`GcNode`] 放置为 `#[repr(C)]` 结构体的第一个
/// 字段，因此常见的 `entry_offset == 0` 情形不需要调用方进行任何不安全
/// 的偏移量运算。在退休 `GcBox<T>` 值时，用 `entry_offset = 0` 调用
/// [`GcInstance::create`]。
#[repr(C)]
pub struct GcBox<T> {
    node: GcNode,
    pub value: T,
}

impl<T> GcBox<T> {
    pub fn new(value: T) -> Box<Self> {
        Box::new(Self {
            node: GcNode::new(),
            value,
        })
    }
}

/// A reclaim callback invoked with the head of a chain of [`GcNode`]s and
/// the opaque `callback_arg` configured at creation time. The callback is
/// responsible for walking `next` pointers itself; it must not panic.
///
/// 一个回收回调函数，调用时会传入 [`GcNode`] 链的头指针，以及创建时
/// 配置的不透明 `callback_arg`。该回调自行负责遍历 `next` 指针；
/// 它不能 panic。
pub type ReclaimFn = unsafe fn(chain_head: *mut GcNode, arg: *mut c_void);

enum Reclaim {
    /// The default reclaim: derive each object's address from its linkage
    /// node via `entry_offset` and drop it in place. `drop_object` is a
    /// monomorphized-per-`T` function pointer.
    ///
    /// 默认回收方式：通过 `entry_offset` 从链接节点推导出每个对象的地址，
    /// 并就地 drop 它。`drop_object` 是一个按 `T` 单态化的函数指针。
    Default { drop_object: unsafe fn(*mut u8) },
    Custom { func: ReclaimFn, arg: *mut c_void },
}

// SAFETY: `Reclaim::Custom::arg` is an opaque pointer whose thread-safety is
// entirely the caller's responsibility, exactly as with a C callback arg;
// `GcCycle` is only ever driven by its single owning drainer, so the pointer
// is never raced over internally.
unsafe impl Send for Reclaim {}

/// Builder for a G/C instance.
///
/// G/C 实例的构建器。
pub struct GcInstanceBuilder {
    entry_offset: usize,
    reclaim: Option<ReclaimFn>,
    callback_arg: *mut c_void,
}

impl GcInstanceBuilder {
    fn new() -> Self {
        Self {
            entry_offset: 0,
            reclaim: None,
            callback_arg: ptr::null_mut(),
        }
    }

    /// Byte offset of the embedded [`GcNode`] within the user object.
    /// Irrelevant if a custom `reclaim` is supplied (the custom callback
    /// decides how to interpret chain nodes), required to be correct when
    /// relying on the default reclaim.
    ///
    /// 嵌入的 [`GcNode`] 在用户对象内部的字节偏移量。如果提供了自定义的
    /// `reclaim`（该回调自行决定如何解释链上的节点），这个值无关紧要；
    /// 如果依赖默认回收方式，则必须正确设置。
    pub fn entry_offset(mut self, offset: usize) -> Self {
        self.entry_offset = offset;
        self
    }

    /// Install a custom reclaim callback, invoked once per `cycle()` with
    /// the whole chain head. If never called, the default reclaim applies:
    /// derive `linkage_addr - entry_offset` and drop the `T` there.
    ///
    /// 安装一个自定义的回收回调，每次 `cycle()` 都会以整条链的头节点
    /// 调用一次。如果从未调用本方法，则采用默认回收方式：推导出
    /// `linkage_addr - entry_offset`，并在该地址 drop 一个 `T`。
    pub fn reclaim(mut self, func: ReclaimFn, arg: *mut c_void) -> Self {
        self.reclaim = Some(func);
        self.callback_arg = arg;
        self
    }

    /// Build the instance for objects of type `T`, where `T` is the type of
    /// the whole allocation that embeds the linkage node at `entry_offset`;
    /// for the common [`GcBox`] convenience path that means `T = GcBox<V>`,
    /// not the inner `V`. `T` only matters for the default reclaim path (it
    /// is unused, beyond monomorphizing the built-in destructor, if a custom
    /// `reclaim` was configured).
    ///
    /// 为类型 `T` 的对象构建实例，其中 `T` 是在 `entry_offset` 处嵌入
    /// 链接节点的整个分配体的类型；对于常见的 [`GcBox`] 便利路径而言，
    /// 这意味着 `T = GcBox<V>`，而不是内部的 `V`。`T` 只对默认回收路径
    /// 有意义（如果配置了自定义的 `reclaim`，它只是用于单态化内置析构
    /// 函数，否则不会被使用）。
    pub fn build<T: 'static>(self) -> (GcCycle, GcInstance) {
        let (sync, ebr) = EbrInstance::create();
        let reclaim = match self.reclaim {
            Some(func) => Reclaim::Custom {
                func,
                arg: self.callback_arg,
            },
            None => Reclaim::Default {
                drop_object: default_drop::<T>,
            },
        };
        let limbo = Arc::new(LimboStack::new());
        let instance = GcInstance {
            ebr,
            limbo: limbo.clone(),
            entry_offset: self.entry_offset,
        };
        let cycle = GcCycle {
            sync,
            limbo,
            entry_offset: self.entry_offset,
            reclaim,
            buckets: [ptr::null_mut(); EBR_EPOCHS],
        };
        (cycle, instance)
    }
}

/// SAFETY: caller guarantees `obj_addr` is the address of a live, uniquely
/// owned `T` previously leaked via `Box::into_raw`.
unsafe fn default_drop<T>(obj_addr: *mut u8) {
    unsafe {
        drop(Box::from_raw(obj_addr as *mut T));
    }
}

/// The shared, producer-side handle for a G/C instance: registration, the
/// reader fast path, and the lock-free limbo inbox. `Clone`-able and safe to
/// share across any number of producer/reader threads.
///
/// G/C 实例中共享的生产者一侧句柄：负责注册、读者快速路径，以及无锁的
/// limbo 收件箱。可以 `Clone`，可以安全地在任意数量的生产者/读者线程
/// 之间共享。
#[derive(Clone)]
pub struct GcInstance {
    ebr: EbrInstance,
    limbo: Arc<LimboStack<GcNode>>,
    entry_offset: usize,
}

impl GcInstance {
    /// Create a G/C instance for objects of type `T` (the type of the whole
    /// allocation, e.g. `GcBox<V>`), with the default reclaim (derive the
    /// object address via `entry_offset` and drop a `T` there). Use
    /// [`GcInstance::builder`] for a custom reclaim callback or a non-zero
    /// `entry_offset`.
    ///
    /// 为类型 `T`（整个分配体的类型，例如 `GcBox<V>`）的对象创建一个
    /// G/C 实例，使用默认回收方式（通过 `entry_offset` 推导出对象地址，
    /// 并在该地址 drop 一个 `T`）。如需自定义回收回调或非零的
    /// `entry_offset`，使用 [`GcInstance::builder`]。
    pub fn create<T: 'static>() -> (GcCycle, GcInstance) {
        Self::builder().build::<T>()
    }

    pub fn builder() -> GcInstanceBuilder {
        GcInstanceBuilder::new()
    }

    /// Register a new reader for the current thread.
    ///
    /// 为当前线程注册一个新的读者。
    pub fn register(&self) -> GcReader {
        GcReader {
            inner: self.ebr.register(),
            depth: Cell::new(0),
        }
    }

    /// Retire `obj_ptr`: compute its linkage node address as
    /// `obj_ptr + entry_offset` and CAS-prepend it onto the lock-free limbo
    /// inbox. Safe to call concurrently from any number of producers.
    ///
    /// 退休 `obj_ptr`：将其链接节点地址计算为 `obj_ptr + entry_offset`，
    /// 并通过 CAS 将其前插到无锁的 limbo 收件箱。可以安全地由任意数量
    /// 的并发生产者调用。
    ///
    /// # Safety
    /// `obj_ptr` must point to a live, uniquely-owned allocation that embeds
    /// a [`GcNode`] at byte offset `entry_offset` (e.g. a `Box<GcBox<T>>`
    /// leaked via `Box::into_raw`, with `entry_offset == 0`), and ownership
    /// of that allocation transfers to the G/C facade: the caller must not
    /// touch it again except through the eventual reclaim callback.
    pub unsafe fn limbo(&self, obj_ptr: *mut u8) {
        let linkage = unsafe { obj_ptr.add(self.entry_offset) as *mut GcNode };
        self.limbo.push(linkage);
    }
}

/// One worker's G/C registration: forwards to the embedded [`EbrReader`],
/// tracking nesting depth so `crit_enter`/`crit_exit` are reentrant even
/// though the underlying EBR `enter`/`exit` are not.
///
/// 一个工作线程的 G/C 注册：转发到内嵌的 [`EbrReader`]，并追踪嵌套深度，
/// 使 `crit_enter`/`crit_exit` 具备可重入性，即便底层的 EBR
/// `enter`/`exit` 并不支持嵌套。
pub struct GcReader {
    inner: EbrReader,
    depth: Cell<usize>,
}

impl GcReader {
    pub fn crit_enter(&self) {
        let depth = self.depth.get();
        if depth == 0 {
            self.inner.enter();
        }
        self.depth.set(depth + 1);
    }

    pub fn crit_exit(&self) {
        let depth = self.depth.get();
        assert!(depth > 0, "gc_crit_exit without a matching gc_crit_enter");
        if depth == 1 {
            self.inner.exit();
        }
        self.depth.set(depth - 1);
    }

    pub fn in_critical(&self) -> bool {
        self.inner.in_critical()
    }
}

/// The unique drainer-side handle for a G/C instance: `cycle`/`full`. There
/// should be exactly one of these alive per instance, owned by the thread
/// driving reclamation, the same convention as [`EbrSync`].
///
/// G/C 实例唯一的排空者一侧句柄：`cycle`/`full`。每个实例应当恰好存在
/// 一个这样的句柄，由驱动回收工作的线程持有，与 [`EbrSync`] 遵循
/// 同样的约定。
pub struct GcCycle {
    sync: EbrSync,
    limbo: Arc<LimboStack<GcNode>>,
    entry_offset: usize,
    reclaim: Reclaim,
    buckets: [*mut GcNode; EBR_EPOCHS],
}

// SAFETY: `GcCycle` is driven by a single owning thread; its raw-pointer
// fields (`buckets`, and the limbo stack it shares with producers) are only
// ever mutated from that thread, so the handle as a whole may be sent to
// another thread (but not shared) like any other single-owner resource.
unsafe impl Send for GcCycle {}

impl GcCycle {
    /// Run one collection cycle:
    ///
    /// 1. Call [`EbrSync::sync`]. If it did not announce a new epoch,
    ///    return immediately.
    /// 2. Detach the limbo chain into `bucket[staging_epoch]` (asserting it
    ///    was empty on entry).
    /// 3. If `bucket[gc_epoch]` is non-empty, invoke the reclaim callback on
    ///    it and clear it; otherwise retry from step 1, up to [`EBR_EPOCHS`]
    ///    total iterations.
    ///
    /// This retry loop is kept even though, in practice, a `sync` call
    /// cannot succeed twice in a row without reader progress in between:
    /// simplifying it to a single pass would not violate the
    /// reclamation-eventuality property, but this implementation keeps the
    /// behavior as written.
    ///
    /// 执行一次回收周期：
    ///
    /// 1. 调用 [`EbrSync::sync`]。如果没有宣告新的纪元，立即返回。
    /// 2. 将 limbo 链摘下，放入 `bucket[staging_epoch]`（进入时会断言
    ///    该桶为空）。
    /// 3. 如果 `bucket[gc_epoch]` 非空，对其调用回收回调并清空；
    ///    否则从第 1 步重试，总共最多重试 [`EBR_EPOCHS`] 次。
    ///
    /// 这个重试循环被保留了下来，尽管实际上 `sync` 调用在没有读者
    /// 取得进展的情况下无法连续两次成功：将其简化为单次遍历并不会
    /// 破坏最终必定回收的性质，但本实现按原样保留了这一行为。
    pub fn cycle(&mut self) {
        for _ in 0..EBR_EPOCHS {
            let (advanced, g) = self.sync.sync();
            if !advanced {
                return;
            }

            let s = self.sync.staging_epoch();
            assert!(
                self.buckets[s].is_null(),
                "gc_cycle: bucket[{s}] was not empty on entry"
            );
            self.buckets[s] = self.limbo.take_all();

            if self.buckets[g].is_null() {
                continue;
            }
            self.invoke_reclaim(g);
            self.buckets[g] = ptr::null_mut();
            return;
        }
    }

    /// Block until the limbo inbox and every bucket are empty, calling
    /// [`GcCycle::cycle`] in a loop with exponential spin backoff capped at
    /// a short spin count, then falling back to sleeping `msec_retry`
    /// milliseconds per iteration (a `msec_retry` of `0` yields instead of
    /// spinning or sleeping).
    ///
    /// 阻塞，直到 limbo 收件箱和每个桶都为空，在循环中调用
    /// [`GcCycle::cycle`]，并以指数退避的方式自旋（上限为较短的自旋
    /// 次数），随后回退为每次迭代休眠 `msec_retry` 毫秒
    /// （`msec_retry` 为 `0` 时让出 CPU，而不是自旋或休眠）。
    pub fn full(&mut self, msec_retry: u64) {
        const SPIN_CAP: u32 = 1 << 10;
        let mut spin = 1u32;

        loop {
            self.cycle();
            if self.limbo.is_empty() && self.buckets.iter().all(|b| b.is_null()) {
                return;
            }

            if spin < SPIN_CAP {
                for _ in 0..spin {
                    std::hint::spin_loop();
                }
                spin *= 2;
            } else if msec_retry == 0 {
                std::thread::yield_now();
            } else {
                std::thread::sleep(Duration::from_millis(msec_retry));
            }
        }
    }

    fn invoke_reclaim(&mut self, g: usize) {
        let chain = self.buckets[g];
        match &self.reclaim {
            Reclaim::Custom { func, arg } => unsafe { func(chain, *arg) },
            Reclaim::Default { drop_object } => {
                let mut cur = chain;
                while !cur.is_null() {
                    // SAFETY: every node in `chain` was published via
                    // `GcInstance::limbo` under that method's safety
                    // contract, and this is the only place that ever
                    // reclaims it.
                    let next = unsafe { (*cur).next.load(Ordering::Relaxed) };
                    let obj_addr = unsafe { (cur as *mut u8).sub(self.entry_offset) };
                    unsafe { drop_object(obj_addr) };
                    cur = next;
                }
            }
        }
    }
}

impl Drop for GcCycle {
    /// Preconditions: limbo empty, all three buckets empty. A violation is a
    /// programmer error, surfaced as a debug-only assertion.
    ///
    /// 前置条件：limbo 为空，三个桶都为空。违反这个前提是编程错误，
    /// 会通过一个仅在调试模式下生效的断言暴露出来。
    fn drop(&mut self) {
        debug_assert!(
            self.limbo.is_empty(),
            "gc_destroy: limbo is not empty; outstanding objects will leak"
        );
        debug_assert!(
            self.buckets.iter().all(|b| b.is_null()),
            "gc_destroy: a reclamation bucket is not empty; outstanding objects will leak"
        );
    }
}
