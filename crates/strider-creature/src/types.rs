//! Common types for creatures

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a spawned creature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureTag(u64);

static NEXT_CREATURE_TAG: AtomicU64 = AtomicU64::new(1);

impl CreatureTag {
    /// Generate a new unique tag
    pub fn new() -> Self {
        CreatureTag(NEXT_CREATURE_TAG.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value (useful for logging)
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CreatureTag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CreatureTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Creature({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_unique() {
        let a = CreatureTag::new();
        let b = CreatureTag::new();

        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_display() {
        let tag = CreatureTag::new();
        assert_eq!(tag.to_string(), format!("Creature({})", tag.raw()));
    }
}
