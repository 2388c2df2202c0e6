//! The tree cache: node store, children dedup, and entity hydration.
//!
//! # Tiers
//!
//! - the root hierarchy snapshot, valid only for the scope it was fetched under
//! - one page of children per parent id, deduplicated through the in-flight
//!   tracker
//! - fully hydrated assets and bundles, each in its own keyspace
//!
//! Every gateway call runs on a spawned task, so a fetch completes and
//! updates the cache even if every caller stops waiting. Writes from a fetch
//! that started before `clear_content_caches` or `reset` are discarded via
//! the content epoch and the tree generation.

use crate::config::CacheConfig;
use crate::gateway::TreeGateway;
use crate::hydration::HydrationTier;
use crate::in_flight::{InFlightEntry, InFlightTracker, SharedFetch};
use crate::notifications::{Notification, NotificationAction, NotificationLevel, NotificationSink};
use crate::scope::ScopeProvider;
use crate::stats::{CacheCounters, CacheStats};
use futures_util::FutureExt;
use sprig_core::{
    Asset, AssetId, Bundle, BundleId, CacheError, CacheResult, ChildrenPage, EntityKind,
    FullEntity, GatewayError, HierarchySnapshot, HydratedEntity, NodeId, NodeRef, ScopeId,
    TreeNode,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Root-level totals for the active scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCounts {
    pub total_bundles: u64,
    pub total_assets: u64,
    pub total_nodes: usize,
}

/// Number of entries held by each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSizes {
    pub children_pages: usize,
    pub in_flight: usize,
    pub assets: usize,
    pub bundles: usize,
}

impl CacheSizes {
    pub fn is_empty(&self) -> bool {
        *self == CacheSizes::default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct TreeState {
    snapshot: Arc<HierarchySnapshot>,
    /// Scope the current snapshot belongs to.
    snapshot_scope: Option<ScopeId>,
    /// Set after a successful root fetch, cleared by `clear_content_caches`.
    fetched_for: Option<ScopeId>,
    loading: bool,
    error: Option<String>,
    /// Bumped by `reset`; root fetches from an older generation never write.
    generation: u64,
}

#[derive(Default)]
pub(crate) struct ChildrenState {
    pub(crate) pages: HashMap<NodeId, Arc<ChildrenPage>>,
    pub(crate) in_flight: InFlightTracker,
}

pub(crate) struct Inner<G, P> {
    pub(crate) gateway: Arc<G>,
    pub(crate) scope: P,
    notifier: Arc<dyn NotificationSink>,
    pub(crate) config: CacheConfig,
    tree: RwLock<TreeState>,
    /// Pages and in-flight markers share one lock so "cached or pending?" is
    /// a single atomic decision.
    children: Mutex<ChildrenState>,
    pub(crate) assets: Arc<HydrationTier<Asset>>,
    pub(crate) bundles: Arc<HydrationTier<Bundle>>,
    pub(crate) content_epoch: AtomicU64,
    next_ticket: AtomicU64,
    pub(crate) counters: CacheCounters,
}

/// Client-side navigation cache over a [`TreeGateway`].
///
/// Cheap to clone; clones share the same state.
pub struct TreeCache<G, P> {
    pub(crate) inner: Arc<Inner<G, P>>,
}

impl<G, P> Clone for TreeCache<G, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum ChildrenPlan {
    Cached(Arc<ChildrenPage>),
    Join(SharedFetch),
    Lead { fetch: SharedFetch, ticket: u64 },
    NoScope,
}

impl<G, P> Inner<G, P>
where
    G: TreeGateway + 'static,
    P: ScopeProvider + 'static,
{
    fn tree_write(&self) -> CacheResult<RwLockWriteGuard<'_, TreeState>> {
        self.tree.write().map_err(|_| CacheError::LockPoisoned)
    }

    fn children_lock(&self) -> CacheResult<MutexGuard<'_, ChildrenState>> {
        self.children.lock().map_err(|_| CacheError::LockPoisoned)
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.content_epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    fn record_error(&self, message: String) {
        if let Ok(mut tree) = self.tree.write() {
            tree.error = Some(message);
        }
    }

    /// Log, count and notify. Exactly one call per failed operation.
    fn report(&self, err: &CacheError, what: &str) {
        self.counters.failure();
        warn!(error = %err, operation = what, "tree cache operation failed");
        self.notifier.notify(
            Notification::new(NotificationLevel::Error, format!("Failed to {what}: {err}"))
                .with_action(NotificationAction::Retry),
        );
    }

    pub(crate) fn fail(&self, err: CacheError, what: &str) -> CacheError {
        self.record_error(format!("Failed to {what}: {err}"));
        self.report(&err, what);
        err
    }

    /// Like [`Inner::fail`] but leaves the error message alone if the caches
    /// were cleared while the fetch was running.
    pub(crate) fn fail_at(&self, err: CacheError, what: &str, epoch: u64) -> CacheError {
        if self.is_current(epoch) {
            self.record_error(format!("Failed to {what}: {err}"));
        }
        self.report(&err, what);
        err
    }

    fn dispatch_children(
        self: &Arc<Self>,
        children: &mut ChildrenState,
        parent_id: &NodeId,
        scope: ScopeId,
        epoch: u64,
    ) -> (SharedFetch, u64) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.counters.children_miss();
        self.counters.network_call();
        debug!(parent_id = %parent_id, scope = %scope, ticket, "fetching children");

        let task = Arc::clone(self);
        let key = parent_id.clone();
        let handle = tokio::spawn(async move {
            let limit = task.config.children_page_limit;
            let result = task.gateway.get_children(scope, &key, limit).await;
            task.settle_children(&key, ticket, epoch, result)
        });

        let abort_key = parent_id.to_string();
        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(CacheError::FetchAborted {
                    key: abort_key,
                    reason: e.to_string(),
                }),
            }
        }
        .boxed()
        .shared();

        // The lock is still held, so the task cannot settle before the marker
        // exists.
        children.in_flight.insert(
            parent_id.clone(),
            InFlightEntry {
                ticket,
                fetch: fetch.clone(),
            },
        );
        (fetch, ticket)
    }

    fn settle_children(
        &self,
        parent_id: &NodeId,
        ticket: u64,
        epoch: u64,
        result: Result<ChildrenPage, GatewayError>,
    ) -> CacheResult<Arc<ChildrenPage>> {
        match result {
            Ok(page) => {
                let page = Arc::new(page);
                let mut children = self.children_lock()?;
                // Checked under the lock: clear bumps the epoch before it
                // takes this lock to empty the pages.
                if self.is_current(epoch) {
                    children.pages.insert(parent_id.clone(), Arc::clone(&page));
                } else {
                    debug!(parent_id = %parent_id, "discarding children fetched before clear");
                }
                children.in_flight.settle(parent_id, ticket);
                trace!(parent_id = %parent_id, count = page.children.len(), "children settled");
                Ok(page)
            }
            Err(e) => {
                if let Ok(mut children) = self.children.lock() {
                    children.in_flight.settle(parent_id, ticket);
                }
                let what = format!("load children of {parent_id}");
                Err(self.fail_at(CacheError::from(e), &what, epoch))
            }
        }
    }

    fn settle_root(
        &self,
        scope: ScopeId,
        generation: u64,
        epoch: u64,
        result: Result<HierarchySnapshot, GatewayError>,
    ) -> CacheResult<()> {
        match result {
            Ok(snapshot) => {
                let mut tree = self.tree_write()?;
                if tree.generation != generation {
                    debug!(scope = %scope, "discarding hierarchy fetched before reset");
                    return Ok(());
                }
                info!(
                    scope = %scope,
                    nodes = snapshot.total_nodes(),
                    "root hierarchy loaded"
                );
                tree.snapshot = Arc::new(snapshot);
                tree.snapshot_scope = Some(scope);
                // A clear while loading must still force the next root fetch.
                // Checked under the tree lock, which clear takes after bumping
                // the epoch.
                if self.is_current(epoch) {
                    tree.fetched_for = Some(scope);
                }
                tree.loading = false;
                tree.error = None;
                Ok(())
            }
            Err(e) => {
                let err = CacheError::from(e);
                let what = "load hierarchy";
                if let Ok(mut tree) = self.tree.write() {
                    if tree.generation == generation {
                        tree.snapshot = Arc::default();
                        tree.snapshot_scope = None;
                        tree.loading = false;
                        tree.error = Some(format!("Failed to {what}: {err}"));
                    }
                }
                self.report(&err, what);
                Err(err)
            }
        }
    }

    fn clear_loading(&self, generation: u64) {
        if let Ok(mut tree) = self.tree.write() {
            if tree.generation == generation {
                tree.loading = false;
            }
        }
    }
}

impl<G, P> TreeCache<G, P>
where
    G: TreeGateway + 'static,
    P: ScopeProvider + 'static,
{
    pub fn new(
        gateway: G,
        scope: P,
        notifier: Arc<dyn NotificationSink>,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway: Arc::new(gateway),
                scope,
                notifier,
                config,
                tree: RwLock::new(TreeState::default()),
                children: Mutex::new(ChildrenState::default()),
                assets: Arc::new(HydrationTier::default()),
                bundles: Arc::new(HydrationTier::default()),
                content_epoch: AtomicU64::new(0),
                next_ticket: AtomicU64::new(0),
                counters: CacheCounters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn scope_provider(&self) -> &P {
        &self.inner.scope
    }

    // =========================================================================
    // NODE STORE
    // =========================================================================

    /// Load the root level of the hierarchy for the active scope.
    ///
    /// No-op while a root fetch is already running, or when a non-empty
    /// snapshot for the active scope is already loaded.
    pub async fn fetch_root_hierarchy(&self) -> CacheResult<()> {
        let inner = &self.inner;
        let Some(scope) = inner.scope.active_scope() else {
            return Err(inner.fail(CacheError::NoActiveScope, "load hierarchy"));
        };

        let (generation, epoch) = {
            let mut tree = inner.tree_write()?;
            if tree.loading {
                debug!(scope = %scope, "root hierarchy already loading");
                return Ok(());
            }
            if tree.fetched_for == Some(scope)
                && tree.snapshot_scope == Some(scope)
                && !tree.snapshot.is_empty()
            {
                trace!(scope = %scope, "root hierarchy already loaded");
                return Ok(());
            }
            if tree.snapshot_scope != Some(scope) {
                tree.snapshot = Arc::default();
                tree.snapshot_scope = None;
            }
            tree.loading = true;
            tree.error = None;
            (tree.generation, inner.epoch())
        };

        inner.counters.network_call();
        debug!(scope = %scope, "fetching root hierarchy");
        let task = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let result = task.gateway.get_hierarchy(scope).await;
            task.settle_root(scope, generation, epoch, result)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                inner.clear_loading(generation);
                let err = CacheError::FetchAborted {
                    key: format!("hierarchy of scope {scope}"),
                    reason: e.to_string(),
                };
                Err(inner.fail(err, "load hierarchy"))
            }
        }
    }

    /// Children of `parent_id`: served from cache, joined onto a pending
    /// fetch, or fetched. Concurrent callers for the same parent share one
    /// gateway call and observe the same outcome.
    pub async fn fetch_children(&self, parent_id: &NodeId) -> CacheResult<Arc<ChildrenPage>> {
        let inner = &self.inner;
        let plan = {
            let mut children = inner.children_lock()?;
            if let Some(page) = children.pages.get(parent_id).cloned() {
                ChildrenPlan::Cached(page)
            } else {
                match inner.scope.active_scope() {
                    None => ChildrenPlan::NoScope,
                    Some(scope) => match children.in_flight.joinable(parent_id) {
                        Some(fetch) => ChildrenPlan::Join(fetch),
                        None => {
                            let epoch = inner.epoch();
                            let (fetch, ticket) =
                                inner.dispatch_children(&mut children, parent_id, scope, epoch);
                            ChildrenPlan::Lead { fetch, ticket }
                        }
                    },
                }
            }
        };

        match plan {
            ChildrenPlan::Cached(page) => {
                inner.counters.children_hit();
                trace!(parent_id = %parent_id, "children cache hit");
                Ok(page)
            }
            ChildrenPlan::NoScope => {
                let what = format!("load children of {parent_id}");
                Err(inner.fail(CacheError::NoActiveScope, &what))
            }
            ChildrenPlan::Join(fetch) => {
                inner.counters.children_join();
                debug!(parent_id = %parent_id, "joining in-flight children fetch");
                self.await_joined(parent_id, fetch).await
            }
            ChildrenPlan::Lead { fetch, ticket } => match fetch.await {
                Err(err @ CacheError::FetchAborted { .. }) => {
                    if let Ok(mut children) = inner.children.lock() {
                        children.in_flight.settle(parent_id, ticket);
                    }
                    let what = format!("load children of {parent_id}");
                    Err(inner.fail(err, &what))
                }
                other => other,
            },
        }
    }

    async fn await_joined(
        &self,
        parent_id: &NodeId,
        fetch: SharedFetch,
    ) -> CacheResult<Arc<ChildrenPage>> {
        let Some(waited) = self.inner.config.join_timeout else {
            return fetch.await;
        };
        match tokio::time::timeout(waited, fetch).await {
            Ok(result) => result,
            Err(_) => {
                let err = CacheError::JoinTimeout {
                    parent_id: parent_id.to_string(),
                    waited,
                };
                let what = format!("load children of {parent_id}");
                Err(self.inner.fail(err, &what))
            }
        }
    }

    // =========================================================================
    // ENTITY HYDRATION
    // =========================================================================

    /// Fully hydrated asset, from cache or one gateway call.
    pub async fn get_asset(&self, id: AssetId) -> CacheResult<Arc<Asset>> {
        let inner = &self.inner;
        if let Some(asset) = inner.assets.get(id)? {
            inner.counters.entity_hits(1);
            trace!(asset_id = %id, "asset cache hit");
            return Ok(asset);
        }
        let Some(scope) = inner.scope.active_scope() else {
            return Err(inner.fail(CacheError::NoActiveScope, &format!("load asset {id}")));
        };
        self.hydrate(id, Arc::clone(&inner.assets), move |gateway| async move {
            gateway.get_asset(scope, id).await
        })
        .await
    }

    /// Fully hydrated bundle, from cache or one gateway call. Bundle ids are
    /// global, so no active scope is needed.
    pub async fn get_bundle(&self, id: BundleId) -> CacheResult<Arc<Bundle>> {
        let inner = &self.inner;
        if let Some(bundle) = inner.bundles.get(id)? {
            inner.counters.entity_hits(1);
            trace!(bundle_id = %id, "bundle cache hit");
            return Ok(bundle);
        }
        self.hydrate(id, Arc::clone(&inner.bundles), move |gateway| async move {
            gateway.get_bundle(id).await
        })
        .await
    }

    /// Hydrate by kind and raw numeric id.
    pub async fn get_full_entity(&self, kind: EntityKind, id: i64) -> CacheResult<FullEntity> {
        match kind {
            EntityKind::Asset => self.get_asset(AssetId(id)).await.map(FullEntity::Asset),
            EntityKind::Bundle => self.get_bundle(BundleId(id)).await.map(FullEntity::Bundle),
        }
    }

    /// Promote a tree summary to its full entity.
    pub async fn hydrate_node(&self, node: &TreeNode) -> CacheResult<FullEntity> {
        let node_ref = node
            .node_ref()
            .map_err(|err| self.inner.fail(err, &format!("open {}", node.id)))?;
        match node_ref {
            NodeRef::Asset(id) => self.get_asset(id).await.map(FullEntity::Asset),
            NodeRef::Bundle(id) => self.get_bundle(id).await.map(FullEntity::Bundle),
        }
    }

    /// Single-entity miss path. Concurrent misses for one id each issue their
    /// own call; the last one to settle wins the cache slot.
    async fn hydrate<T, F, Fut>(
        &self,
        id: T::Id,
        tier: Arc<HydrationTier<T>>,
        fetch: F,
    ) -> CacheResult<Arc<T>>
    where
        T: HydratedEntity,
        F: FnOnce(Arc<G>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        let inner = &self.inner;
        inner.counters.entity_misses(1);
        inner.counters.network_call();
        let epoch = inner.epoch();
        let kind = T::KIND;
        debug!(kind = %kind, id = %id, "hydrating entity");

        let task = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let what = format!("load {kind} {id}");
            match fetch(Arc::clone(&task.gateway)).await {
                Ok(entity) => {
                    let entity = Arc::new(entity);
                    tier.store_all(std::slice::from_ref(&entity), || task.is_current(epoch))
                        .map(|_| entity)
                }
                Err(e) => Err(task.fail_at(CacheError::from(e), &what, epoch)),
            }
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let err = CacheError::FetchAborted {
                    key: format!("{kind}-{id}"),
                    reason: e.to_string(),
                };
                Err(inner.fail(err, &format!("load {kind} {id}")))
            }
        }
    }

    // =========================================================================
    // INVALIDATION
    // =========================================================================

    /// Empty the children cache and both entity tiers and forget which scope
    /// the root was fetched for. Loading flags, pending fetches and the root
    /// snapshot itself are left alone; pending fetches will not write back.
    pub fn clear_content_caches(&self) -> CacheResult<()> {
        let inner = &self.inner;
        inner.content_epoch.fetch_add(1, Ordering::SeqCst);
        inner.children_lock()?.pages.clear();
        inner.assets.clear()?;
        inner.bundles.clear()?;
        inner.tree_write()?.fetched_for = None;
        info!("content caches cleared");
        Ok(())
    }

    /// Return to the just-constructed state.
    pub fn reset(&self) -> CacheResult<()> {
        let inner = &self.inner;
        inner.content_epoch.fetch_add(1, Ordering::SeqCst);
        {
            let mut tree = inner.tree_write()?;
            let generation = tree.generation.wrapping_add(1);
            *tree = TreeState {
                generation,
                ..TreeState::default()
            };
        }
        {
            let mut children = inner.children_lock()?;
            children.pages.clear();
            children.in_flight.clear();
        }
        inner.assets.clear()?;
        inner.bundles.clear()?;
        inner.counters.reset();
        info!("tree cache reset");
        Ok(())
    }

    /// Clear content caches whenever the watched scope changes. The listener
    /// ends when the sender is dropped.
    pub fn spawn_scope_listener(
        &self,
        mut scopes: watch::Receiver<Option<ScopeId>>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            while scopes.changed().await.is_ok() {
                let scope = *scopes.borrow_and_update();
                info!(scope = ?scope, "active scope changed");
                if let Err(e) = cache.clear_content_caches() {
                    warn!(error = %e, "failed to clear caches after scope change");
                }
            }
        })
    }

    // =========================================================================
    // OBSERVABLE STATE
    // =========================================================================

    /// Root hierarchy for the active scope. A snapshot fetched under another
    /// scope is never returned.
    pub fn hierarchy(&self) -> Option<Arc<HierarchySnapshot>> {
        let scope = self.inner.scope.active_scope()?;
        let tree = self.inner.tree.read().unwrap_or_else(PoisonError::into_inner);
        (tree.snapshot_scope == Some(scope)).then(|| Arc::clone(&tree.snapshot))
    }

    pub fn counts(&self) -> TreeCounts {
        self.hierarchy()
            .map(|snapshot| TreeCounts {
                total_bundles: snapshot.total_bundles,
                total_assets: snapshot.total_assets,
                total_nodes: snapshot.total_nodes(),
            })
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.inner
            .tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .loading
    }

    /// Last recorded failure message, cleared by the next successful root
    /// load or by `reset`.
    pub fn error(&self) -> Option<String> {
        self.inner
            .tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .error
            .clone()
    }

    /// Parents with a children fetch in flight.
    pub fn loading_children(&self) -> Vec<NodeId> {
        self.inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .keys()
    }

    pub fn is_loading_children(&self, parent_id: &NodeId) -> bool {
        self.inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .contains(parent_id)
    }

    /// Cached children page, without fetching.
    pub fn cached_children(&self, parent_id: &NodeId) -> Option<Arc<ChildrenPage>> {
        self.inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pages
            .get(parent_id)
            .cloned()
    }

    pub fn cached_asset(&self, id: AssetId) -> Option<Arc<Asset>> {
        self.inner.assets.get(id).ok().flatten()
    }

    pub fn cached_bundle(&self, id: BundleId) -> Option<Arc<Bundle>> {
        self.inner.bundles.get(id).ok().flatten()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }

    pub fn sizes(&self) -> CacheResult<CacheSizes> {
        let inner = &self.inner;
        let (children_pages, in_flight) = {
            let children = inner.children_lock()?;
            (children.pages.len(), children.in_flight.len())
        };
        Ok(CacheSizes {
            children_pages,
            in_flight,
            assets: inner.assets.len()?,
            bundles: inner.bundles.len()?,
        })
    }
}
