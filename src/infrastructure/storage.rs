//! Storage implementation for token buckets.
//!
//! Provides concurrent, sharded storage for per-action bucket state.

use crate::application::ports::Storage;
use dashmap::DashMap;
use std::hash::Hash;

/// Thread-safe sharded storage backed by DashMap.
///
/// Each shard has its own lock, so mutating one bucket only blocks callers
/// whose buckets hash to the same shard, and only for the duration of the
/// accessor. Remote calls never run while an entry is held.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, ahash::RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// Implement the Storage port
impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn insert(&self, key: K, value: V) {
        self.map.insert(key, value);
    }

    fn with_entry_mut<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&mut V) -> R,
    {
        let mut value_ref = self.map.get_mut(key)?;
        Some(accessor(value_ref.value_mut()))
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn for_each_mut<F>(&self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        for mut entry in self.map.iter_mut() {
            let (key, value) = entry.pair_mut();
            f(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let storage = ShardedStorage::new();

        storage.insert("key1", 100);
        storage.insert("key2", 200);

        assert_eq!(storage.with_entry_mut(&"key1", |value| *value), Some(100));
        assert_eq!(storage.with_entry_mut(&"key2", |value| *value), Some(200));
        assert!(storage.with_entry_mut(&"key3", |value| *value).is_none());

        assert_eq!(storage.len(), 2);
        assert!(!storage.is_empty());
    }

    #[test]
    fn test_with_entry_mut() {
        let storage = ShardedStorage::new();
        storage.insert("key", 100);

        let result = storage.with_entry_mut(&"key", |value| {
            *value += 1;
            *value
        });
        assert_eq!(result, Some(101));
        assert_eq!(storage.with_entry_mut(&"key", |value| *value), Some(101));

        assert_eq!(storage.with_entry_mut(&"missing", |value| *value), None);
    }

    #[test]
    fn test_for_each_mut_visits_all() {
        let storage = ShardedStorage::new();
        for i in 0..5 {
            storage.insert(i, i * 10);
        }

        let mut total = 0;
        storage.for_each_mut(|key, value| {
            *value += key;
            total += *value;
        });
        assert_eq!(total, 110);
        assert_eq!(storage.with_entry_mut(&4, |value| *value), Some(44));
    }

    #[test]
    fn test_concurrent_mutation_is_serialized() {
        use std::sync::Arc;
        use std::thread;

        let storage = Arc::new(ShardedStorage::new());
        storage.insert("counter", 0u64);
        let mut handles = vec![];

        for _ in 0..10 {
            let storage_clone = Arc::clone(&storage);
            let handle = thread::spawn(move || {
                for _ in 0..100 {
                    storage_clone.with_entry_mut(&"counter", |value| *value += 1);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.with_entry_mut(&"counter", |value| *value), Some(1000));
    }
}
