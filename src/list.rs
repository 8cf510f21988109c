//! A minimal intrusive, lock-free singly-linked list used for two purposes:
//! reader registration (QSBR and EBR both need one) and the G/C facade's
//! limbo inbox.
//!
//! Insertion is a classic Treiber-stack CAS-prepend. There is no removal:
//! reader records are attached for the worker's lifetime and intentionally
//! leaked for the lifetime of the owning instance rather than
//! reference-counted and cleaned up.

use crate::sync::{AtomicPtr, Ordering};
use std::marker::PhantomData;
use std::ptr;

/// Cache-line padded so that the intrusive `next` pointer and the payload
/// never share a line with a neighboring registrant's hot fields.
///
/// 按缓存行对齐填充，使嵌入的 `next` 指针和负载字段
/// 不会与相邻注册者的热字段共享同一缓存行。
#[repr(align(64))]
pub(crate) struct Node<T> {
    value: T,
    next: AtomicPtr<Node<T>>,
}

/// A lock-free, insert-only, append-to-front registration list.
///
/// 一个无锁的、只能插入的、前插式注册列表。
pub(crate) struct RegistryList<T> {
    head: AtomicPtr<Node<T>>,
    _marker: PhantomData<T>,
}

// SAFETY: the list only ever mutates nodes through atomics after they are
// published, and never frees a published node. Sharing `&RegistryList<T>`
// across threads is sound as long as `T` itself is `Sync`; sending it is
// sound as long as `T` is `Send`.
unsafe impl<T: Send> Send for RegistryList<T> {}
unsafe impl<T: Sync> Sync for RegistryList<T> {}

impl<T> RegistryList<T> {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Leak a new node holding `value` and CAS-prepend it onto the list.
    /// Returns a raw pointer to the embedded value, valid for as long as the
    /// list itself (the node is never freed).
    ///
    /// 泄漏一个持有 `value` 的新节点，并通过 CAS 将其前插到列表中。
    /// 返回指向嵌入值的原始指针，该指针在列表本身存续期间始终有效
    /// （节点永远不会被释放）。
    pub(crate) fn insert(&self, value: T) -> *const T {
        let node = Box::into_raw(Box::new(Node {
            value,
            next: AtomicPtr::new(ptr::null_mut()),
        }));

        let mut head = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: `node` was just allocated by us and is not yet shared.
            unsafe {
                (*node).next.store(head, Ordering::Relaxed);
            }
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(observed) => head = observed,
            }
        }

        // SAFETY: `node` is now reachable from `head` and never freed.
        unsafe { ptr::addr_of!((*node).value) }
    }

    /// Snapshot-iterate the list as of the moment of the call. Registrants
    /// inserted concurrently during the scan may or may not be observed.
    ///
    /// 对列表进行调用时刻的快照迭代。在扫描期间并发插入的注册者
    /// 可能被观察到，也可能不会。
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            cur: self.head.load(Ordering::Acquire),
            _marker: PhantomData,
        }
    }
}

pub(crate) struct Iter<'a, T> {
    cur: *mut Node<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() {
            return None;
        }
        // SAFETY: `cur` was published via `RegistryList::insert` and is
        // never freed while the list lives.
        unsafe {
            let value = &(*self.cur).value;
            self.cur = (*self.cur).next.load(Ordering::Acquire);
            Some(value)
        }
    }
}

/// Implemented by node types that carry their own intrusive `next` pointer,
/// so that `LimboStack` can stay generic instead of hard-coding `GcNode`.
///
/// 由携带自身嵌入式 `next` 指针的节点类型实现，
/// 使 `LimboStack` 可以保持泛型，而不必硬编码 `GcNode`。
pub(crate) trait Linked {
    fn next_ptr(&self) -> &AtomicPtr<Self>
    where
        Self: Sized;
}

/// A lock-free multi-producer LIFO stack over intrusively-linked chains.
/// Unlike `RegistryList`, entries here are consumed: `take_all` atomically
/// detaches the whole chain for a drainer to walk.
///
/// 一个基于嵌入式链表的无锁多生产者 LIFO 栈。
/// 与 `RegistryList` 不同，这里的条目会被消费：`take_all`
/// 原子地摘下整条链，交给排空者遍历。
pub(crate) struct LimboStack<N> {
    head: AtomicPtr<N>,
}

unsafe impl<N: Send> Send for LimboStack<N> {}
unsafe impl<N: Send> Sync for LimboStack<N> {}

impl<N: Linked> LimboStack<N> {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// CAS-prepend `node` (whose `next` field this call owns and will
    /// overwrite) onto the stack. Safe to call from any number of
    /// concurrent producers.
    ///
    /// 通过 CAS 将 `node`（其 `next` 字段的所有权由本次调用持有，
    /// 并会被覆写）前插到栈上。可以安全地由任意数量的并发生产者调用。
    pub(crate) fn push(&self, node: *mut N) {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: caller hands us unique ownership of `node`'s `next`
            // field until it is published by the CAS below.
            unsafe {
                (*node).next_ptr().store(head, Ordering::Relaxed);
            }
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(observed) => head = observed,
            }
        }
    }

    /// Detach the entire chain, leaving the stack empty. Safe to call
    /// concurrently with `push` from producers; not safe to call
    /// concurrently with another `take_all` (the G/C facade serializes this
    /// under its single drainer handle).
    ///
    /// 摘下整条链，使栈变为空。可以安全地与生产者的 `push` 并发调用；
    /// 但不能与另一个 `take_all` 并发调用（G/C 外观层通过其唯一的
    /// 排空者句柄来保证这一点的串行化）。
    pub(crate) fn take_all(&self) -> *mut N {
        self.head.swap(ptr::null_mut(), Ordering::AcqRel)
    }
}
