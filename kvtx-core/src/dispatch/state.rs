use std::collections::VecDeque;

use kvtx_common::ids::Key;

use crate::containers::HotMap as HashMap;

/// One value stored in the keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Binary-safe string payload.
    String(Vec<u8>),
    /// Ordered list payload. Never stored empty.
    List(VecDeque<Vec<u8>>),
}

impl StoredValue {
    /// Returns the Redis `TYPE` name of this value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }
}

/// Mutable in-memory keyspace operated on by command handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyspace {
    entries: HashMap<Key, StoredValue>,
}

impl Keyspace {
    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&StoredValue> {
        self.entries.get(key)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut StoredValue> {
        self.entries.get_mut(key)
    }

    /// Returns whether `key` holds a value.
    #[must_use]
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `value` under `key`, returning the replaced value.
    pub fn insert(&mut self, key: &[u8], value: StoredValue) -> Option<StoredValue> {
        self.entries.insert(key.to_vec(), value)
    }

    /// Removes `key`, returning the removed value.
    pub fn remove(&mut self, key: &[u8]) -> Option<StoredValue> {
        self.entries.remove(key)
    }

    /// Drops `key` when it holds an empty list.
    pub fn remove_if_empty_list(&mut self, key: &[u8]) {
        if matches!(self.entries.get(key), Some(StoredValue::List(items)) if items.is_empty()) {
            let _ = self.entries.remove(key);
        }
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the keyspace holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
