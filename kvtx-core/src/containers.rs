//! Hot-path container aliases used by the keyspace, command table and lock table.
//!
//! Keeping these choices in one place lets container upgrades happen without touching command
//! logic modules.

use hashbrown::{HashMap as HbMap, HashSet as HbSet};

/// Hot-path hash map used by keyspace and lock tables.
pub type HotMap<K, V> = HbMap<K, V>;

/// Hot-path hash set used by denylists and lock owner sets.
pub type HotSet<T> = HbSet<T>;
