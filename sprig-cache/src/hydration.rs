//! Entity hydration tiers.
//!
//! One tier per entity kind. Assets and bundles live in separate integer
//! keyspaces, so they are never mixed.

use sprig_core::{CacheError, CacheResult, HydratedEntity};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache of fully hydrated entities keyed by their id.
#[derive(Debug)]
pub(crate) struct HydrationTier<T: HydratedEntity> {
    entries: Mutex<HashMap<T::Id, Arc<T>>>,
}

/// Result of splitting requested ids against a tier.
#[derive(Debug)]
pub(crate) struct Partition<T: HydratedEntity> {
    pub(crate) hits: HashMap<T::Id, Arc<T>>,
    /// Uncached ids, duplicates removed, in first-appearance order.
    pub(crate) misses: Vec<T::Id>,
}

impl<T: HydratedEntity> Default for HydrationTier<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: HydratedEntity> HydrationTier<T> {
    fn lock(&self) -> CacheResult<MutexGuard<'_, HashMap<T::Id, Arc<T>>>> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }

    pub(crate) fn get(&self, id: T::Id) -> CacheResult<Option<Arc<T>>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    pub(crate) fn partition(&self, ids: &[T::Id]) -> CacheResult<Partition<T>> {
        let entries = self.lock()?;
        let mut hits = HashMap::new();
        let mut misses = Vec::new();
        let mut seen = HashSet::new();
        for &id in ids {
            match entries.get(&id) {
                Some(entity) => {
                    hits.insert(id, Arc::clone(entity));
                }
                None => {
                    if seen.insert(id) {
                        misses.push(id);
                    }
                }
            }
        }
        Ok(Partition { hits, misses })
    }

    /// Store entities unless `still_current` says the content epoch moved on
    /// while they were being fetched. The check runs under the tier lock so a
    /// concurrent clear cannot interleave. Returns whether anything was stored.
    pub(crate) fn store_all<F>(&self, entities: &[Arc<T>], still_current: F) -> CacheResult<bool>
    where
        F: FnOnce() -> bool,
    {
        let mut entries = self.lock()?;
        if !still_current() {
            return Ok(false);
        }
        for entity in entities {
            // Last write wins for concurrent misses of the same id.
            entries.insert(entity.entity_id(), Arc::clone(entity));
        }
        Ok(true)
    }

    pub(crate) fn len(&self) -> CacheResult<usize> {
        Ok(self.lock()?.len())
    }

    pub(crate) fn clear(&self) -> CacheResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{Asset, AssetId};
    use sprig_test_utils::fixtures::make_asset;

    #[test]
    fn test_partition_dedups_misses_in_order() {
        let tier = HydrationTier::<Asset>::default();
        tier.store_all(&[Arc::new(make_asset(2))], || true).unwrap();

        let ids = [AssetId(5), AssetId(2), AssetId(5), AssetId(9)];
        let partition = tier.partition(&ids).unwrap();

        assert_eq!(partition.misses, vec![AssetId(5), AssetId(9)]);
        assert_eq!(partition.hits.len(), 1);
        assert!(partition.hits.contains_key(&AssetId(2)));
    }

    #[test]
    fn test_store_skipped_when_epoch_moved() {
        let tier = HydrationTier::<Asset>::default();
        let stored = tier.store_all(&[Arc::new(make_asset(1))], || false).unwrap();
        assert!(!stored);
        assert_eq!(tier.len().unwrap(), 0);
    }

    #[test]
    fn test_cached_entry_keeps_identity() {
        let tier = HydrationTier::<Asset>::default();
        let asset = Arc::new(make_asset(3));
        tier.store_all(&[Arc::clone(&asset)], || true).unwrap();

        let first = tier.get(AssetId(3)).unwrap().unwrap();
        let second = tier.get(AssetId(3)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &asset));
        assert!(Arc::ptr_eq(&first, &second));

        tier.clear().unwrap();
        assert!(tier.get(AssetId(3)).unwrap().is_none());
    }
}
