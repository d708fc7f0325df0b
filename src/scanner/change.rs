//! QuietTextCache: content-addressable skip of money-free text
//!
//! Full rescans revisit every unprocessed text leaf. Most of them contain no
//! money at all, and re-lexing them on every mutation burst is wasted work.
//! This cache remembers the hashes of texts the lexer found empty so later
//! passes can skip them. Lexing depends only on the text, so settings changes
//! never invalidate it.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

// =============================================================================
// Types
// =============================================================================

/// Cache counters for diagnostics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuietCacheStats {
    pub entries: usize,
    pub check_count: u64,
    pub skip_count: u64,
    pub skip_rate: f64,
}

// =============================================================================
// QuietTextCache
// =============================================================================

/// Bounded set of hashes of texts known to hold no money mention
#[derive(Debug, Clone)]
pub struct QuietTextCache {
    quiet: HashSet<u64>,
    capacity: usize,
    /// Number of lookups performed
    check_count: u64,
    /// Number of lookups that let the caller skip lexing
    skip_count: u64,
}

impl Default for QuietTextCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl QuietTextCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            quiet: HashSet::new(),
            capacity,
            check_count: 0,
            skip_count: 0,
        }
    }

    /// True if `text` was previously recorded as money-free
    pub fn is_quiet(&mut self, text: &str) -> bool {
        self.check_count += 1;
        let hit = self.quiet.contains(&Self::compute_hash(text));
        if hit {
            self.skip_count += 1;
        }
        hit
    }

    /// Record `text` as money-free. Clears everything once full.
    pub fn remember(&mut self, text: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.quiet.len() >= self.capacity {
            self.quiet.clear();
        }
        self.quiet.insert(Self::compute_hash(text));
    }

    pub fn len(&self) -> usize {
        self.quiet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiet.is_empty()
    }

    /// Skip rate as percentage
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn stats(&self) -> QuietCacheStats {
        QuietCacheStats {
            entries: self.quiet.len(),
            check_count: self.check_count,
            skip_count: self.skip_count,
            skip_rate: self.skip_rate(),
        }
    }

    fn compute_hash(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Requirement 1: Unknown text is never quiet
    // -------------------------------------------------------------------------
    #[test]
    fn test_unknown_text_not_quiet() {
        let mut cache = QuietTextCache::default();
        assert!(!cache.is_quiet("Hello world"));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Remembered text is quiet
    // -------------------------------------------------------------------------
    #[test]
    fn test_remembered_text_quiet() {
        let mut cache = QuietTextCache::default();
        cache.remember("Hello world");
        assert!(cache.is_quiet("Hello world"));
        assert!(!cache.is_quiet("Hello  world"));
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Skip rate counts hits
    // -------------------------------------------------------------------------
    #[test]
    fn test_skip_rate() {
        let mut cache = QuietTextCache::default();
        cache.is_quiet("A"); // miss
        cache.remember("A");
        cache.is_quiet("A"); // hit
        cache.is_quiet("A"); // hit
        cache.is_quiet("B"); // miss

        assert_eq!(cache.stats().check_count, 4);
        assert_eq!(cache.stats().skip_count, 2);
        assert!((cache.skip_rate() - 50.0).abs() < 0.01);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: Capacity bound clears the set
    // -------------------------------------------------------------------------
    #[test]
    fn test_capacity_bound() {
        let mut cache = QuietTextCache::new(2);
        cache.remember("a");
        cache.remember("b");
        assert_eq!(cache.len(), 2);
        cache.remember("c");
        assert_eq!(cache.len(), 1);
        assert!(cache.is_quiet("c"));
        assert!(!cache.is_quiet("a"));
    }

    // -------------------------------------------------------------------------
    // Requirement 5: Zero capacity disables caching
    // -------------------------------------------------------------------------
    #[test]
    fn test_zero_capacity() {
        let mut cache = QuietTextCache::new(0);
        cache.remember("a");
        assert!(cache.is_empty());
        assert!(!cache.is_quiet("a"));
    }
}
