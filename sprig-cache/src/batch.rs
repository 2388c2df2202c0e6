//! Batch hydration with order-preserving reconciliation.

use crate::gateway::TreeGateway;
use crate::hydration::Partition;
use crate::scope::ScopeProvider;
use crate::store::TreeCache;
use sprig_core::{Asset, AssetId, CacheError, CacheResult, HydratedEntity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Project `ids` through `lookup`, keeping request order and duplicates.
/// Ids with no entry are dropped.
pub fn reconcile<T: HydratedEntity>(ids: &[T::Id], lookup: &HashMap<T::Id, Arc<T>>) -> Vec<Arc<T>> {
    ids.iter().filter_map(|id| lookup.get(id).cloned()).collect()
}

impl<G, P> TreeCache<G, P>
where
    G: TreeGateway + 'static,
    P: ScopeProvider + 'static,
{
    /// Hydrate many assets at once.
    ///
    /// Cached assets are reused and the rest are fetched in a single gateway
    /// call. The result follows `ids` order, repeats included, silently
    /// skipping ids the service did not return. A failed call fails the whole
    /// batch and caches nothing.
    pub async fn batch_get_assets(&self, ids: &[AssetId]) -> CacheResult<Vec<Arc<Asset>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let inner = &self.inner;
        let Partition { hits, misses } = inner.assets.partition(ids)?;
        let hit_count = ids.iter().filter(|id| hits.contains_key(*id)).count();
        inner.counters.entity_hits(hit_count as u64);

        if misses.is_empty() {
            trace!(requested = ids.len(), "batch served from cache");
            return Ok(reconcile(ids, &hits));
        }

        let what = format!("load {} assets", misses.len());
        let Some(scope) = inner.scope.active_scope() else {
            return Err(inner.fail(CacheError::NoActiveScope, &what));
        };

        inner.counters.entity_misses(misses.len() as u64);
        inner.counters.network_call();
        let epoch = inner.epoch();
        debug!(
            requested = ids.len(),
            cached = hits.len(),
            fetching = misses.len(),
            scope = %scope,
            "batch hydrating assets"
        );

        let task = Arc::clone(inner);
        let task_what = what.clone();
        let handle = tokio::spawn(async move {
            match task.gateway.batch_get_assets(scope, &misses).await {
                Ok(assets) => {
                    let fetched: Vec<Arc<Asset>> = assets.into_iter().map(Arc::new).collect();
                    task.assets
                        .store_all(&fetched, || task.is_current(epoch))
                        .map(|_| fetched)
                }
                Err(e) => Err(task.fail_at(CacheError::from(e), &task_what, epoch)),
            }
        });

        let fetched = match handle.await {
            Ok(result) => result?,
            Err(e) => {
                let err = CacheError::FetchAborted {
                    key: "asset batch".to_string(),
                    reason: e.to_string(),
                };
                return Err(inner.fail(err, &what));
            }
        };

        let mut lookup = hits;
        for asset in fetched {
            lookup.entry(asset.entity_id()).or_insert(asset);
        }
        Ok(reconcile(ids, &lookup))
    }
}
