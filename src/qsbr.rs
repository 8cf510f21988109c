//! Quiescent-State-Based Reclamation (QSBR).
//!
//! The minimum-viable reclamation primitive: a monotone global generation
//! counter plus a per-reader, locally observed generation. Readers advertise
//! quiescence explicitly by calling [`QsbrReader::checkpoint`]; a writer
//! obtains a target generation via [`QsbrInstance::barrier`] and tests
//! whether it has become universally observed via [`QsbrReader::sync`].
//!
//! Unlike [`crate::ebr`], QSBR has no notion of a critical section: a reader
//! simply calls `checkpoint()` whenever it reaches a point in its own
//! execution where it is known to hold no references to reclaimable data.

use crate::list::RegistryList;
use crate::sync::{fence, Arc, AtomicU64, Ordering};

struct QsbrSlot {
    local_generation: AtomicU64,
}

struct Shared {
    global_generation: AtomicU64,
    readers: RegistryList<QsbrSlot>,
}

/// Builder for [`QsbrInstance`]. Currently there is nothing to configure
/// beyond construction, but the builder is kept so that future knobs, such
/// as a custom starting generation for tests, have an obvious place to land
/// without an API break.
///
/// `QsbrInstance` 的构建器。目前除了构造之外没有其他可配置项，
/// 但保留这个构建器是为了给未来的配置项（例如测试用的自定义起始代数）
/// 留一个不会破坏 API 的落脚点。
#[derive(Default)]
pub struct QsbrInstanceBuilder {
    _private: (),
}

impl QsbrInstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> QsbrInstance {
        QsbrInstance {
            shared: Arc::new(Shared {
                // Global generation starts at 1, never at 0.
                global_generation: AtomicU64::new(1),
                readers: RegistryList::new(),
            }),
        }
    }
}

/// A QSBR domain. Cheap to `Clone` (it is an `Arc` handle) and shared freely
/// across the writer(s) and every registered reader.
///
/// 一个 QSBR 域。`Clone` 的代价很低（它是一个 `Arc` 句柄），
/// 可以在写者和每个已注册的读者之间自由共享。
#[derive(Clone)]
pub struct QsbrInstance {
    shared: Arc<Shared>,
}

impl QsbrInstance {
    /// Create a new QSBR instance with an empty reader list.
    ///
    /// 创建一个带有空读者列表的新 QSBR 实例。
    pub fn create() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> QsbrInstanceBuilder {
        QsbrInstanceBuilder::new()
    }

    /// Attach a reader record for a new worker.
    ///
    /// Each call allocates one fresh, independent record: there is no
    /// implicit thread-local lookup backing this call, so "idempotent per
    /// worker" is a contract the *caller* upholds by registering once per
    /// worker and retaining the returned handle, not something this method
    /// can detect and deduplicate on your behalf.
    ///
    /// 为一个新的工作线程附加一条读者记录。
    ///
    /// 每次调用都会分配一条全新的、独立的记录：这里没有隐式的
    /// 线程本地查找机制，因此"每个工作线程幂等"这一契约是由*调用方*
    /// 自行保证的（每个工作线程只注册一次，并保留返回的句柄），
    /// 而不是本方法能够自动检测并去重的。
    pub fn register(&self) -> QsbrReader {
        let slot = self.shared.readers.insert(QsbrSlot {
            local_generation: AtomicU64::new(0),
        });
        QsbrReader {
            shared: self.shared.clone(),
            slot,
        }
    }

    /// Atomically increment the global generation and return the
    /// post-increment value: `sync(target)` accepts `target` once every
    /// reader's local generation is `>= target`. Safe to call from any
    /// number of concurrent writers, the increment itself is the only
    /// synchronization a writer needs.
    ///
    /// 原子地递增全局代数，并返回递增后的值：一旦每个读者的本地代数
    /// 都 `>= target`，`sync(target)` 就会接受 `target`。可以安全地由
    /// 任意数量的并发写者调用，递增操作本身就是写者所需要的唯一同步。
    pub fn barrier(&self) -> u64 {
        self.shared.global_generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for QsbrInstance {
    fn default() -> Self {
        Self::create()
    }
}

/// One worker's QSBR registration. Not `Sync`: a `QsbrReader` is meant to be
/// owned and driven by a single thread.
///
/// 一个工作线程的 QSBR 注册。不是 `Sync` 的：`QsbrReader`
/// 应当由单个线程持有并驱动。
pub struct QsbrReader {
    shared: Arc<Shared>,
    slot: *const QsbrSlot,
}

// SAFETY: `slot` points at a `RegistryList` node that outlives `shared`
// (leaked for the instance's lifetime) and is only ever touched through
// atomics after publication, so moving a `QsbrReader` to another thread is
// sound even though it carries a raw pointer.
unsafe impl Send for QsbrReader {}

impl QsbrReader {
    #[inline]
    fn slot(&self) -> &QsbrSlot {
        // SAFETY: see the `Send` justification above, the node is never
        // freed while `shared` (an `Arc` we hold a clone of) is alive.
        unsafe { &*self.slot }
    }

    /// Publish the current global generation as this worker's quiescent
    /// state. This call is a full memory barrier as observed by the caller,
    /// realized here as the store plus an explicit `SeqCst` fence, so that
    /// no prior work from this worker's critical region is reordered past
    /// the publication.
    ///
    /// 将当前的全局代数发布为此工作线程的静止状态。本调用对调用方而言是
    /// 一次完整的内存屏障，在这里通过一次存储加上一个显式的 `SeqCst`
    /// 栅栏来实现，从而保证该工作线程临界区域内的任何先前操作
    /// 都不会被重排到这次发布之后。
    #[inline]
    pub fn checkpoint(&self) {
        let g = self.shared.global_generation.load(Ordering::Acquire);
        self.slot().local_generation.store(g, Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Checkpoint on behalf of this worker, then test whether `target` has
    /// become globally observed. Read-only with respect to the global
    /// generation: concurrent `sync` calls from different readers never
    /// interfere with each other or with `barrier`.
    ///
    /// 代表此工作线程执行一次检查点，然后测试 `target` 是否已经
    /// 被全局观察到。相对于全局代数而言是只读的：来自不同读者的并发
    /// `sync` 调用彼此之间、以及与 `barrier` 之间都不会相互干扰。
    pub fn sync(&self, target: u64) -> bool {
        self.checkpoint();
        self.shared
            .readers
            .iter()
            .all(|slot| slot.local_generation.load(Ordering::Acquire) >= target)
    }
}
