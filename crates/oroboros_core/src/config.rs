//! # Runtime Configuration
//!
//! Compile-time defaults for container growth and pool geometry, plus the
//! TOML-loadable overrides read once at startup.
//!
//! ```toml
//! [containers]
//! min_grow = 32
//! max_grow = 4096
//!
//! [pool]
//! puddle_elements = 256
//! max_puddles = 64
//! ```

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// DEFAULTS
// =============================================================================

/// Smallest number of slots a container grows by.
pub const DEFAULT_MIN_GROW: usize = 16;

/// Largest number of slots a container grows by in one re-allocation.
pub const DEFAULT_MAX_GROW: usize = 1 << 16;

/// Slots per pool puddle.
pub const DEFAULT_PUDDLE_ELEMENTS: usize = 256;

/// Maximum puddles a growable pool may allocate.
pub const DEFAULT_MAX_PUDDLES: usize = 256;

/// Largest number of slots one pool can address through a 16-bit tag address.
pub const MAX_POOL_SLOTS: usize = 1 << 16;

/// Byte size of one string atom arena chunk.
pub const ATOM_CHUNK_SIZE: usize = 1 << 14;

/// Bucket count of the per-thread string atom table.
pub const ATOM_TABLE_BUCKETS: usize = 1024;

// =============================================================================
// ALLOCATION STRATEGY
// =============================================================================

/// Growth policy shared by every array-backed container.
///
/// A container with no spare room grows by `clamp(capacity / 2, min_grow, max_grow)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AllocStrategy {
    /// Lower bound of one growth step.
    pub min_grow: usize,
    /// Upper bound of one growth step.
    pub max_grow: usize,
}

impl AllocStrategy {
    /// Creates a strategy with explicit bounds.
    #[inline]
    #[must_use]
    pub const fn new(min_grow: usize, max_grow: usize) -> Self {
        Self { min_grow, max_grow }
    }

    /// A strategy that never grows (fixed capacity containers).
    #[inline]
    #[must_use]
    pub const fn fixed() -> Self {
        Self { min_grow: 0, max_grow: 0 }
    }

    /// Returns the number of slots to add to a container of `capacity`.
    #[inline]
    #[must_use]
    pub fn grow_by(&self, capacity: usize) -> usize {
        let half = capacity >> 1;
        if half < self.min_grow {
            self.min_grow
        } else if half > self.max_grow {
            self.max_grow
        } else {
            half
        }
    }

    /// Checks the bounds are usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `min_grow > max_grow`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_grow > self.max_grow {
            return Err(CoreError::InvalidConfig(format!(
                "min_grow ({}) exceeds max_grow ({})",
                self.min_grow, self.max_grow
            )));
        }
        Ok(())
    }
}

impl Default for AllocStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_GROW, DEFAULT_MAX_GROW)
    }
}

// =============================================================================
// POOL GEOMETRY
// =============================================================================

/// Puddle geometry of a pool allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots per puddle.
    pub puddle_elements: usize,
    /// Maximum number of puddles.
    pub max_puddles: usize,
}

impl PoolConfig {
    /// Geometry of a single fixed puddle holding `capacity` slots.
    #[inline]
    #[must_use]
    pub const fn fixed(capacity: usize) -> Self {
        Self {
            puddle_elements: capacity,
            max_puddles: 1,
        }
    }

    /// Total number of slots the pool can ever hold.
    #[inline]
    #[must_use]
    pub const fn max_slots(&self) -> usize {
        self.puddle_elements * self.max_puddles
    }

    /// Checks the geometry fits the 16-bit tag address space.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] on zero sizes or more than
    /// [`MAX_POOL_SLOTS`] addressable slots.
    pub fn validate(&self) -> CoreResult<()> {
        if self.puddle_elements == 0 || self.max_puddles == 0 {
            return Err(CoreError::InvalidConfig(
                "pool puddle_elements and max_puddles must be non-zero".into(),
            ));
        }
        match self.puddle_elements.checked_mul(self.max_puddles) {
            Some(slots) if slots <= MAX_POOL_SLOTS => Ok(()),
            _ => Err(CoreError::InvalidConfig(format!(
                "pool geometry {}x{} exceeds {} addressable slots",
                self.puddle_elements, self.max_puddles, MAX_POOL_SLOTS
            ))),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            puddle_elements: DEFAULT_PUDDLE_ELEMENTS,
            max_puddles: DEFAULT_MAX_PUDDLES,
        }
    }
}

// =============================================================================
// TOP-LEVEL CONFIG
// =============================================================================

/// Startup configuration for the core runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Default growth policy for containers.
    pub containers: AllocStrategy,
    /// Default geometry for growable pools.
    pub pool: PoolConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    ///
    /// Missing tables and keys fall back to the compile-time defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] on malformed TOML and
    /// [`CoreError::InvalidConfig`] when values are out of range.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> CoreResult<()> {
        self.containers.validate()?;
        self.pool.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_by_clamps() {
        let strategy = AllocStrategy::new(16, 1024);
        assert_eq!(strategy.grow_by(0), 16);
        assert_eq!(strategy.grow_by(64), 32);
        assert_eq!(strategy.grow_by(100_000), 1024);
        assert_eq!(AllocStrategy::fixed().grow_by(128), 0);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.pool.max_slots(), MAX_POOL_SLOTS);
    }

    #[test]
    fn test_config_partial_override() {
        let config = CoreConfig::from_toml_str(
            "[containers]\nmin_grow = 32\n\n[pool]\nmax_puddles = 4\n",
        )
        .unwrap();
        assert_eq!(config.containers.min_grow, 32);
        assert_eq!(config.containers.max_grow, DEFAULT_MAX_GROW);
        assert_eq!(config.pool.max_puddles, 4);
        assert_eq!(config.pool.puddle_elements, DEFAULT_PUDDLE_ELEMENTS);
    }

    #[test]
    fn test_config_rejects_oversized_pool() {
        let err = CoreConfig::from_toml_str("[pool]\npuddle_elements = 1024\nmax_puddles = 128\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_rejects_bad_strategy() {
        let err = CoreConfig::from_toml_str("[containers]\nmin_grow = 10\nmax_grow = 2\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_parse_error() {
        let err = CoreConfig::from_toml_str("[pool\n").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
