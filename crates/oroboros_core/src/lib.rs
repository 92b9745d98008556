//! # OROBOROS Core Runtime
//!
//! The foundation every other OROBOROS crate allocates through:
//! - Growable containers over one double-ended element buffer
//! - A lock-free, ABA-safe pool allocator
//! - Intrusive reference counting with [`Ptr<T>`]
//!
//! ## Architecture Rules
//!
//! 1. **Broken contracts stop the world** - Out-of-range indices, duplicate
//!    keys and double frees panic instead of returning garbage
//! 2. **Stable addresses** - Pool objects and arena bytes never move
//! 3. **Threads meet only at the pool and the counters** - Containers are
//!    single-owner and need `&mut` to change
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_core::{Array, Dictionary, PoolAllocator};
//!
//! let mut names: Dictionary<u32, &str> = Dictionary::new();
//! names.insert(7, "seven");
//!
//! let pool: PoolAllocator<[f32; 4]> = PoolAllocator::new();
//! let slot = pool.boxed([0.0; 4]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod containers;
pub mod error;
pub mod memory;
pub mod refcount;

pub use config::{AllocStrategy, CoreConfig, PoolConfig};
pub use containers::{
    Array, ArrayMap, Dictionary, ElementBuffer, HashSet, InlineArray, KeyValuePair, Queue, Set,
    SetHasher,
};
pub use error::{CoreError, CoreResult};
pub use memory::{Arena, PoolAllocator, PoolBox, Tag};
pub use refcount::{Ptr, RefCount, RefCounted, Reclaim};
