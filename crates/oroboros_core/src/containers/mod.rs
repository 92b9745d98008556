//! # Containers
//!
//! Growable containers built on one double-ended storage primitive.
//!
//! None of these are thread-safe. They are `Send` when their elements are,
//! and mutation always needs `&mut`.

mod array;
mod array_map;
mod dictionary;
mod element_buffer;
mod hash_set;
mod inline_array;
mod key_value;
mod queue;
mod set;

pub use array::{Array, IntoIter};
pub use array_map::ArrayMap;
pub use dictionary::Dictionary;
pub use element_buffer::ElementBuffer;
pub use hash_set::{HashSet, SetHasher};
pub use inline_array::InlineArray;
pub use key_value::KeyValuePair;
pub use queue::Queue;
pub use set::Set;
