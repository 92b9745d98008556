//! # Core Error Types
//!
//! Almost every failure in this crate is a broken contract and stops the
//! world. The few places where a caller can sensibly react (duplicate keys,
//! an exhausted pool, a bad config file) report through [`CoreError`].

use thiserror::Error;

/// Errors that can be recovered from by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An ordered container already holds an element with an equal key.
    #[error("duplicate key inserted into ordered container")]
    DuplicateKey,

    /// The pool allocator cannot hand out another slot.
    #[error("pool allocator exhausted: capacity {capacity} slots")]
    PoolExhausted {
        /// Maximum number of slots the pool can ever hold.
        capacity: usize,
    },

    /// Configuration values violate a runtime limit.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("config parse error: {0}")]
    Config(String),
}

/// Result type for recoverable core operations.
pub type CoreResult<T> = Result<T, CoreError>;
