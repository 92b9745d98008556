//! # OROBOROS Atoms
//!
//! Interned strings for names that are created rarely and compared often:
//! asset paths, shader uniforms, event ids. [`StringBuilder`] assembles new
//! names before they are interned.
//!
//! ## Architecture Rules
//!
//! 1. **One table per thread** - Interning never takes a shared lock
//! 2. **Strings never move** - Storage is append-only and outlives the
//!    table as long as an atom points into it
//! 3. **Identity within a thread, content across threads** - Equality stays
//!    correct when atoms migrate
//!
//! ## Example
//!
//! ```rust,ignore
//! use oroboros_atoms::StringAtom;
//!
//! let albedo = StringAtom::new("u_albedo");
//! assert_eq!(albedo, StringAtom::from("u_albedo")); // pointer compare
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]
#![warn(clippy::pedantic)]

mod atom;
mod buffer;
mod builder;
pub mod hash;
mod table;

pub use atom::StringAtom;
pub use builder::StringBuilder;
pub use hash::{hash_str, one_at_a_time};
