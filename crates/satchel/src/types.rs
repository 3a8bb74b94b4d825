//! Shared type definitions for the satchel crate
//!
//! This module contains common types that are used across multiple components
//! of the bundler, ensuring consistency and avoiding circular dependencies.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use serde::Serialize;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Unique identifier for a module within one build
///
/// Identities are assigned in discovery order starting from zero and are the
/// only key the emitted runtime uses to look modules up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// The entry module always receives the first identity
    pub const ENTRY: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value of the ModuleId
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_entry(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the graph builder treats two imports that resolve to the same file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Every resolved location is analyzed once and shares one identity
    #[default]
    Shared,

    /// Every import edge analyzes a fresh module, except when the target is
    /// already on the importer's ancestor chain (which would never terminate)
    Legacy,
}

impl DedupPolicy {
    pub const fn from_dedupe_flag(dedupe: bool) -> Self {
        if dedupe { Self::Shared } else { Self::Legacy }
    }
}

impl std::fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ModuleId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_dedup_policy_from_flag() {
        assert_eq!(DedupPolicy::from_dedupe_flag(true), DedupPolicy::Shared);
        assert_eq!(DedupPolicy::from_dedupe_flag(false), DedupPolicy::Legacy);
        assert_eq!(DedupPolicy::default(), DedupPolicy::Shared);
    }
}
