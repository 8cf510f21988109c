//! Shim over `std::sync`/`std::cell`/`std::sync::atomic` vs. their `loom`
//! equivalents, selected by the `loom` feature.
//!
//! Every other module imports its primitives from here rather than from
//! `std` directly, so that `cargo test --features loom` exhaustively model-checks
//! the same code that ships to users.

#[cfg(feature = "loom")]
pub use loom::cell::Cell;
#[cfg(not(feature = "loom"))]
pub use std::cell::Cell;

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{fence, AtomicPtr, AtomicU32, AtomicU64, AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{fence, AtomicPtr, AtomicU32, AtomicU64, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub use loom::sync::Arc;
#[cfg(not(feature = "loom"))]
pub use std::sync::Arc;
