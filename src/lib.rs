//! # QSBR, EBR, and epoch-backed garbage collection
//!
//! This crate provides two deferred-reclamation primitives for lock-free,
//! multi-threaded data structures, plus a garbage-collection facade built on
//! one of them:
//!
//! - [`qsbr`]: Quiescent-State-Based Reclamation, the cheapest possible
//!   scheme, driven entirely by readers explicitly advertising quiescent
//!   points.
//! - [`ebr`]: Epoch-Based Reclamation, a three-epoch scheme with explicit
//!   reader critical sections (`enter`/`exit`), for readers that cannot
//!   easily identify their own quiescent points.
//! - [`gc`]: a garbage-collection facade layered on top of `ebr` that turns
//!   the primitive into a full write-stage-reclaim pipeline for objects
//!   embedding a small linkage header.
//!
//! None of the three components allocates the objects they protect, tracks
//! a reader's lifetime against the collector's cycle (readers must be
//! quiescent before unregistering), or provides wait-free writers. The
//! reader fast path, `checkpoint`/`enter`/`exit`, is wait-free; the
//! synchronizer side (`sync`/`cycle`/`full`) must be serialized by the
//! caller, typically by routing it through a single dedicated thread.
//!
//! ## Quick tour
//!
//! ```
//! use epoch_reclaim::gc::{GcBox, GcInstance};
//!
//! // One G/C instance per kind of object you retire through it.
//! let (mut cycle, gc) = GcInstance::create::<GcBox<i32>>();
//! let reader = gc.register();
//!
//! reader.crit_enter();
//! // ... read shared data while pinned ...
//! reader.crit_exit();
//!
//! let boxed = GcBox::new(42i32);
//! unsafe {
//!     gc.limbo(Box::into_raw(boxed) as *mut u8);
//! }
//! cycle.full(1);
//! ```

pub mod ebr;
pub mod gc;
mod list;
pub mod qsbr;
mod sync;

pub use ebr::{EbrInstance, EbrInstanceBuilder, EbrReader, EbrSync, EBR_EPOCHS};
pub use gc::{GcBox, GcCycle, GcInstance, GcInstanceBuilder, GcNode, GcReader, ReclaimFn};
pub use qsbr::{QsbrInstance, QsbrInstanceBuilder, QsbrReader};

#[cfg(test)]
mod tests;
