//! # Memory Management
//!
//! Raw allocation primitives, a chunked bump arena and the lock-free pool
//! allocator.
//!
//! ## Design Philosophy
//!
//! - Allocation failure aborts; there is no recoverable out-of-memory path
//! - Objects handed out by the arena and the pools never move
//! - The pool is the only thread-safe allocator; everything else is owned
//!   by one thread at a time

mod arena;
mod pool;
pub mod raw;
mod tag;

pub use arena::Arena;
pub use pool::{PoolAllocator, PoolBox};
pub use tag::Tag;
