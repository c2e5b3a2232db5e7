//! Index statistics.
//!
//! The engine is single-threaded, so counters are plain integers owned by
//! the engine and copied out on request.
//!
//! # Usage
//!
//! ```rust,ignore
//! let stats = engine.stats();
//! println!("Adds: {}", stats.adds);
//! println!("Pruned slots: {}", stats.pruned_slots);
//! ```

use std::ops::AddAssign;

/// What one traversal reclaimed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Weak slots whose referent had died.
    pub dead_slots: usize,
    /// Map keys erased because everything beneath them had died.
    pub dead_keys: usize,
}

impl SweepStats {
    /// Returns true if nothing was reclaimed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dead_slots == 0 && self.dead_keys == 0
    }
}

impl AddAssign for SweepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.dead_slots += rhs.dead_slots;
        self.dead_keys += rhs.dead_keys;
    }
}

/// Cumulative counters for an [`IndexEngine`](crate::IndexEngine).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Entities registered successfully.
    pub adds: u64,
    /// Entities rejected by a key projection.
    pub rejected_adds: u64,
    /// Existing slots repointed instead of inserting a new one.
    pub repointed_slots: u64,
    /// Exact-match and as-of lookups.
    pub lookups: u64,
    /// Prefix, range and full scans.
    pub scans: u64,
    /// Dead weak slots reclaimed.
    pub pruned_slots: u64,
    /// Empty map keys erased.
    pub pruned_keys: u64,
}

impl IndexStats {
    /// Creates a zeroed stats instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sweep(&mut self, sweep: SweepStats) {
        self.pruned_slots += sweep.dead_slots as u64;
        self.pruned_keys += sweep.dead_keys as u64;
    }
}
