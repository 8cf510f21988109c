//! Epoch-Based Reclamation (EBR): a three-epoch reclamation primitive with
//! explicit reader critical sections.
//!
//! A reader marks an "active" window with [`EbrReader::enter`]/
//! [`EbrReader::exit`]; a synchronizer advances the global epoch with
//! [`EbrSync::sync`] once every currently-active reader has observed it.
//! Three epochs are exactly enough: the grace-period argument below shows
//! that the epoch two behind the one just announced can never still be
//! observed by an active reader.
//!
//! ## Grace-period argument
//!
//! With exactly three epochs and a successful `sync` that moves the global
//! epoch from `e-1` to `e`: no active reader can be observing `e-2`, because
//! (a) a reader that entered before the previous successful `sync` has since
//! exited, otherwise that `sync` would not have succeeded, and (b) any
//! reader entering now observes `e-1` or `e`. Therefore `e-2`'s reclaim
//! bucket is safe to drain. Choosing more than three epochs would re-derive
//! this proof from scratch; three is the minimum that makes it hold.

use crate::list::RegistryList;
use crate::sync::{fence, Arc, AtomicU32, AtomicUsize, Ordering};

/// Number of epochs the EBR core cycles through. Exposed so callers can size
/// their own per-epoch bookkeeping (the G/C facade uses it to size its
/// bucket array).
pub const EBR_EPOCHS: usize = 3;

const ACTIVE_BIT: u32 = 1 << 31;
const EPOCH_MASK: u32 = ACTIVE_BIT - 1;

struct EbrSlot {
    // Low bits: observed global epoch in 0..EBR_EPOCHS. High bit: ACTIVE.
    epoch_and_active: AtomicU32,
}

struct Shared {
    global_epoch: AtomicUsize,
    readers: RegistryList<EbrSlot>,
}

fn gc_epoch_of(staging_epoch: usize) -> usize {
    (staging_epoch + 1) % EBR_EPOCHS
}

/// Builder for [`EbrInstance`].
///
/// `EbrInstance` 的构建器。
#[derive(Default)]
pub struct EbrInstanceBuilder {
    _private: (),
}

impl EbrInstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the instance, returning both the shared registration handle and
    /// the unique synchronizer handle.
    ///
    /// 构建实例，同时返回共享的注册句柄和唯一的同步器句柄。
    pub fn build(self) -> (EbrSync, EbrInstance) {
        let shared = Arc::new(Shared {
            global_epoch: AtomicUsize::new(0),
            readers: RegistryList::new(),
        });
        let instance = EbrInstance {
            shared: shared.clone(),
        };
        (EbrSync { shared }, instance)
    }
}

/// The shared, `Clone`-able side of an EBR domain: registration and the
/// reader fast path. Create one with [`EbrInstance::create`] and clone it
/// into every thread that needs to register a reader.
///
/// EBR 域中共享的、可 `Clone` 的一侧：负责注册以及读者的快速路径。
/// 通过 [`EbrInstance::create`] 创建一个实例，并将它克隆到每个
/// 需要注册读者的线程中。
#[derive(Clone)]
pub struct EbrInstance {
    shared: Arc<Shared>,
}

impl EbrInstance {
    /// Create a new EBR instance. Returns the unique [`EbrSync`] handle
    /// alongside the shared `EbrInstance`.
    ///
    /// 创建一个新的 EBR 实例。返回唯一的 [`EbrSync`] 句柄，
    /// 以及共享的 `EbrInstance`。
    pub fn create() -> (EbrSync, Self) {
        Self::builder().build()
    }

    pub fn builder() -> EbrInstanceBuilder {
        EbrInstanceBuilder::new()
    }

    /// Attach a reader record for a new worker. See
    /// [`crate::qsbr::QsbrInstance::register`] for the idempotence caveat;
    /// the same one applies here.
    ///
    /// 为一个新的工作线程附加一条读者记录。幂等性方面的注意事项见
    /// [`crate::qsbr::QsbrInstance::register`]，同样的说明在此也适用。
    pub fn register(&self) -> EbrReader {
        let slot = self.shared.readers.insert(EbrSlot {
            epoch_and_active: AtomicU32::new(0),
        });
        EbrReader {
            shared: self.shared.clone(),
            slot,
        }
    }
}

/// One worker's EBR registration: the wait-free reader fast path.
///
/// Not `Sync`, by the same single-owning-thread convention as
/// [`crate::qsbr::QsbrReader`]. Nesting `enter`/`exit` is not supported, so
/// callers that need reentrant pinning should track their own depth and
/// only call `exit` once it drops to zero (see [`crate::gc::GcReader`] for a
/// facade that does exactly this).
///
/// 一个工作线程的 EBR 注册：无等待的读者快速路径。
///
/// 与 [`crate::qsbr::QsbrReader`] 一样遵循单线程持有的约定，不是 `Sync`
/// 的。不支持嵌套的 `enter`/`exit`，因此需要可重入钉住的调用方应当
/// 自行追踪深度，只有当深度降为零时才调用 `exit`（参见
/// [`crate::gc::GcReader`]，它正是这样一个外观层）。
pub struct EbrReader {
    shared: Arc<Shared>,
    slot: *const EbrSlot,
}

// SAFETY: see `QsbrReader`'s identical justification.
unsafe impl Send for EbrReader {}

impl EbrReader {
    #[inline]
    fn slot(&self) -> &EbrSlot {
        // SAFETY: the node is leaked for the instance's lifetime and only
        // mutated through atomics after publication.
        unsafe { &*self.slot }
    }

    /// Begin a critical section: publish `{epoch = current global epoch,
    /// ACTIVE = 1}` then fence. Wait-free: a single atomic store plus one
    /// `SeqCst` fence. The fence ensures no load inside the critical section
    /// is reordered before the publication of the observed epoch.
    ///
    /// 开始一个临界区：发布 `{epoch = 当前全局纪元, ACTIVE = 1}`，
    /// 然后设置栅栏。无等待：只需一次原子存储加一个 `SeqCst` 栅栏。
    /// 该栅栏确保临界区内的任何加载操作都不会被重排到
    /// 已观察纪元的发布之前。
    #[inline]
    pub fn enter(&self) {
        let epoch = self.shared.global_epoch.load(Ordering::Relaxed) as u32;
        self.slot()
            .epoch_and_active
            .store((epoch & EPOCH_MASK) | ACTIVE_BIT, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    /// End a critical section: fence then clear the record (writes 0). The
    /// fence ensures any store made during the critical section is globally
    /// visible before this reader is considered inactive.
    ///
    /// 结束一个临界区：先设置栅栏，再清空记录（写入 0）。该栅栏确保
    /// 临界区内所做的任何存储操作，在该读者被视为非活跃之前，
    /// 已经全局可见。
    #[inline]
    pub fn exit(&self) {
        fence(Ordering::SeqCst);
        self.slot().epoch_and_active.store(0, Ordering::Relaxed);
    }

    /// Diagnostic: is this reader currently inside a critical section?
    ///
    /// 诊断用途：该读者当前是否处于临界区内？
    #[inline]
    pub fn in_critical(&self) -> bool {
        self.slot().epoch_and_active.load(Ordering::Relaxed) & ACTIVE_BIT != 0
    }
}

/// The unique synchronizer handle for an EBR instance. There should be
/// exactly one of these alive per instance (not enforced by the type
/// system, only by convention), obtained via [`EbrInstance::create`] or
/// [`EbrInstanceBuilder::build`]. `sync`, `staging_epoch`, and `gc_epoch`
/// must be mutually serialized against each other and against the G/C
/// facade's `cycle`/`full` on the same instance.
///
/// 一个 EBR 实例唯一的同步器句柄。每个实例应当恰好存在一个这样的句柄
/// （这不是由类型系统强制的，只是一种约定），通过 [`EbrInstance::create`]
/// 或 [`EbrInstanceBuilder::build`] 获得。`sync`、`staging_epoch` 和
/// `gc_epoch` 必须相互串行化，并且与同一实例上 G/C 外观层的
/// `cycle`/`full` 串行化。
pub struct EbrSync {
    shared: Arc<Shared>,
}

impl EbrSync {
    /// Snapshot the global epoch, fence, then scan the reader list. If every
    /// active reader has observed the snapshot epoch, advance the global
    /// epoch by one (mod [`EBR_EPOCHS`]) and return `(true, gc_epoch)` for
    /// the *new* epoch; otherwise return `(false, gc_epoch)` for the
    /// snapshot epoch unchanged.
    ///
    /// 对全局纪元取快照，设置栅栏，然后扫描读者列表。如果每个活跃读者
    /// 都已观察到快照纪元，就将全局纪元前进一步（对 [`EBR_EPOCHS`]
    /// 取模），并为*新*纪元返回 `(true, gc_epoch)`；否则为未改变的
    /// 快照纪元返回 `(false, gc_epoch)`。
    pub fn sync(&mut self) -> (bool, usize) {
        let e = self.shared.global_epoch.load(Ordering::SeqCst);
        fence(Ordering::SeqCst);

        let all_observe_e = self.shared.readers.iter().all(|slot| {
            let word = slot.epoch_and_active.load(Ordering::Acquire);
            if word & ACTIVE_BIT == 0 {
                true
            } else {
                (word & EPOCH_MASK) as usize == e
            }
        });

        if all_observe_e {
            let new_e = (e + 1) % EBR_EPOCHS;
            self.shared.global_epoch.store(new_e, Ordering::SeqCst);
            (true, gc_epoch_of(new_e))
        } else {
            (false, gc_epoch_of(e))
        }
    }

    /// The epoch currently being staged into by writers.
    ///
    /// 写者当前正在写入（暂存）的纪元。
    pub fn staging_epoch(&self) -> usize {
        self.shared.global_epoch.load(Ordering::Acquire)
    }

    /// The epoch known to be quiesced: `(staging_epoch() + 1) % EBR_EPOCHS`,
    /// equivalently `staging_epoch() - 2` under modulo-3 clock arithmetic.
    ///
    /// 已知已经静止的纪元：`(staging_epoch() + 1) % EBR_EPOCHS`，
    /// 在模 3 时钟算术下等价于 `staging_epoch() - 2`。
    pub fn gc_epoch(&self) -> usize {
        gc_epoch_of(self.staging_epoch())
    }
}
