//! Sprig Test Utilities
//!
//! Centralized test infrastructure for the Sprig workspace:
//! - A scriptable in-memory [`MockGateway`]
//! - Proptest generators for ids, nodes and entities
//! - Test fixtures for common hierarchies
//! - Custom assertions for cache errors

// Re-export core types for convenience
pub use sprig_core::{
    Asset, AssetId, Bundle, BundleId, CacheError, CacheResult, ChildrenPage, GatewayError,
    HierarchySnapshot, NodeId, NodeKind, ScopeId, Timestamp, TreeNode,
};

use async_trait::async_trait;
use sprig_cache::{Notification, NotificationLog, NotificationSink, TreeGateway};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

// ============================================================================
// MOCK GATEWAY
// ============================================================================

/// Gateway operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Hierarchy,
    Children,
    Asset,
    Bundle,
    BatchAssets,
}

impl Endpoint {
    const ALL: [Endpoint; 5] = [
        Endpoint::Hierarchy,
        Endpoint::Children,
        Endpoint::Asset,
        Endpoint::Bundle,
        Endpoint::BatchAssets,
    ];

    fn index(self) -> usize {
        match self {
            Endpoint::Hierarchy => 0,
            Endpoint::Children => 1,
            Endpoint::Asset => 2,
            Endpoint::Bundle => 3,
            Endpoint::BatchAssets => 4,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Endpoint::Hierarchy => "/tree",
            Endpoint::Children => "/tree/children",
            Endpoint::Asset => "/assets/{id}",
            Endpoint::Bundle => "/bundles/{id}",
            Endpoint::BatchAssets => "/assets/bulk",
        }
    }
}

/// In-memory [`TreeGateway`] for tests.
///
/// Responses are scripted per scope / parent / id. Every call is counted on
/// entry, so a test can observe dispatch while the call is held pending by
/// [`MockGateway::hold`].
#[derive(Debug)]
pub struct MockGateway {
    hierarchies: Mutex<HashMap<ScopeId, HierarchySnapshot>>,
    children: Mutex<HashMap<NodeId, ChildrenPage>>,
    assets: Mutex<HashMap<AssetId, Asset>>,
    bundles: Mutex<HashMap<BundleId, Bundle>>,
    failures: Mutex<HashMap<Endpoint, GatewayError>>,
    calls: [AtomicUsize; 5],
    batch_requests: Mutex<Vec<Vec<AssetId>>>,
    children_limits: Mutex<Vec<u32>>,
    gate: watch::Sender<bool>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let (gate, _rx) = watch::channel(true);
        Self {
            hierarchies: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            assets: Mutex::new(HashMap::new()),
            bundles: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Default::default(),
            batch_requests: Mutex::new(Vec::new()),
            children_limits: Mutex::new(Vec::new()),
            gate,
        }
    }

    pub fn with_hierarchy(self, scope: ScopeId, snapshot: HierarchySnapshot) -> Self {
        self.set_hierarchy(scope, snapshot);
        self
    }

    pub fn with_children(self, page: ChildrenPage) -> Self {
        self.set_children(page);
        self
    }

    pub fn with_assets(self, assets: impl IntoIterator<Item = Asset>) -> Self {
        for asset in assets {
            self.set_asset(asset);
        }
        self
    }

    pub fn with_bundles(self, bundles: impl IntoIterator<Item = Bundle>) -> Self {
        for bundle in bundles {
            self.set_bundle(bundle);
        }
        self
    }

    pub fn set_hierarchy(&self, scope: ScopeId, snapshot: HierarchySnapshot) {
        self.hierarchies.lock().unwrap().insert(scope, snapshot);
    }

    pub fn set_children(&self, page: ChildrenPage) {
        self.children.lock().unwrap().insert(page.parent_id.clone(), page);
    }

    pub fn set_asset(&self, asset: Asset) {
        self.assets.lock().unwrap().insert(asset.id, asset);
    }

    pub fn set_bundle(&self, bundle: Bundle) {
        self.bundles.lock().unwrap().insert(bundle.id, bundle);
    }

    /// Make every later call to `endpoint` fail with an HTTP 500.
    pub fn fail(&self, endpoint: Endpoint) {
        self.fail_with(
            endpoint,
            GatewayError::Http {
                endpoint: endpoint.path().to_string(),
                status: 500,
                message: "Internal Server Error".to_string(),
            },
        );
    }

    pub fn fail_with(&self, endpoint: Endpoint, error: GatewayError) {
        self.failures.lock().unwrap().insert(endpoint, error);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.failures.lock().unwrap().remove(&endpoint);
    }

    /// Hold every call pending until [`MockGateway::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls[endpoint.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Endpoint::ALL.iter().map(|e| self.calls(*e)).sum()
    }

    /// Ids requested by each batch call, in call order.
    pub fn batch_requests(&self) -> Vec<Vec<AssetId>> {
        self.batch_requests.lock().unwrap().clone()
    }

    /// Page limits passed to each children call, in call order.
    pub fn children_limits(&self) -> Vec<u32> {
        self.children_limits.lock().unwrap().clone()
    }

    /// Wait (yielding to the runtime) until `endpoint` has been called at
    /// least `n` times.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, n: usize) {
        while self.calls(endpoint) < n {
            tokio::task::yield_now().await;
        }
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        self.calls[endpoint.index()].fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = gate.wait_for(|open| *open).await;
        match self.failures.lock().unwrap().get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TreeGateway for MockGateway {
    async fn get_hierarchy(&self, scope: ScopeId) -> Result<HierarchySnapshot, GatewayError> {
        self.enter(Endpoint::Hierarchy).await?;
        Ok(self
            .hierarchies
            .lock()
            .unwrap()
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_children(
        &self,
        _scope: ScopeId,
        parent_id: &NodeId,
        limit: u32,
    ) -> Result<ChildrenPage, GatewayError> {
        self.children_limits.lock().unwrap().push(limit);
        self.enter(Endpoint::Children).await?;
        let page = self
            .children
            .lock()
            .unwrap()
            .get(parent_id)
            .cloned()
            .unwrap_or_else(|| ChildrenPage::empty(parent_id.clone()));
        Ok(page)
    }

    async fn get_asset(&self, _scope: ScopeId, id: AssetId) -> Result<Asset, GatewayError> {
        self.enter(Endpoint::Asset).await?;
        self.assets
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                entity: "asset",
                id: id.to_string(),
            })
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, GatewayError> {
        self.enter(Endpoint::Bundle).await?;
        self.bundles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                entity: "bundle",
                id: id.to_string(),
            })
    }

    async fn batch_get_assets(
        &self,
        _scope: ScopeId,
        ids: &[AssetId],
    ) -> Result<Vec<Asset>, GatewayError> {
        self.batch_requests.lock().unwrap().push(ids.to_vec());
        self.enter(Endpoint::BatchAssets).await?;
        let assets = self.assets.lock().unwrap();
        // Reverse order: callers must not rely on the service's ordering.
        let unique: HashSet<AssetId> = ids.iter().copied().collect();
        let mut found: Vec<Asset> = unique.iter().filter_map(|id| assets.get(id).cloned()).collect();
        found.sort_by_key(|a| std::cmp::Reverse(a.id));
        Ok(found)
    }
}

/// Notification sink that also counts deliveries.
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: NotificationLog,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.log.len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.log.snapshot().into_iter().map(|n| n.message).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.log.notify(notification);
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Sprig types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_scope_id() -> impl Strategy<Value = ScopeId> {
        (1i64..1_000).prop_map(ScopeId)
    }

    pub fn arb_asset_id() -> impl Strategy<Value = AssetId> {
        (1i64..10_000).prop_map(AssetId)
    }

    pub fn arb_bundle_id() -> impl Strategy<Value = BundleId> {
        (1i64..10_000).prop_map(BundleId)
    }

    pub fn arb_node_kind() -> impl Strategy<Value = NodeKind> {
        prop_oneof![Just(NodeKind::Asset), Just(NodeKind::Bundle)]
    }

    /// Well-formed node ids (`asset-<n>` / `bundle-<n>`).
    pub fn arb_node_id() -> impl Strategy<Value = NodeId> {
        prop_oneof![
            arb_asset_id().prop_map(NodeId::for_asset),
            arb_bundle_id().prop_map(NodeId::for_bundle),
        ]
    }

    /// Batch request ids drawn from a small pool so repeats are common.
    pub fn arb_batch_request() -> impl Strategy<Value = Vec<AssetId>> {
        proptest::collection::vec((1i64..16).prop_map(AssetId), 0..24)
    }

    pub fn arb_asset() -> impl Strategy<Value = Asset> {
        (arb_asset_id(), "[a-z]{1,12}", prop_oneof![Just("pdf"), Just("csv_row"), Just("text")])
            .prop_map(|(id, title, kind)| {
                let mut asset = fixtures::make_asset(id.get());
                asset.title = title;
                asset.kind = kind.to_string();
                asset
            })
    }

    pub fn arb_tree_node() -> impl Strategy<Value = TreeNode> {
        (arb_node_id(), "[a-z]{1,12}", any::<bool>()).prop_map(|(id, name, has_children)| {
            let mut node = match id.node_ref() {
                Ok(sprig_core::NodeRef::Asset(asset)) => fixtures::asset_node(asset.get(), None),
                Ok(sprig_core::NodeRef::Bundle(bundle)) => fixtures::bundle_node(bundle.get(), None),
                Err(_) => unreachable!("generated ids are well-formed"),
            };
            node.name = name;
            node.has_children = has_children;
            node
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities and hierarchies for common test scenarios.

    use super::*;
    use chrono::TimeZone;

    pub fn fixed_timestamp() -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn make_asset(id: i64) -> Asset {
        Asset {
            id: AssetId(id),
            title: format!("asset {id}"),
            kind: "text".to_string(),
            uuid: None,
            parent_asset_id: None,
            part_index: None,
            text_content: Some(format!("full text of asset {id}")),
            blob_path: None,
            source_identifier: None,
            source_metadata: Some(serde_json::json!({ "fixture": true })),
            processing_status: Some("ready".to_string()),
            created_at: fixed_timestamp(),
            updated_at: fixed_timestamp(),
        }
    }

    pub fn make_bundle(id: i64) -> Bundle {
        Bundle {
            id: BundleId(id),
            name: format!("bundle {id}"),
            description: None,
            tags: Some(vec!["fixture".to_string()]),
            purpose: None,
            asset_count: 0,
            child_bundle_count: 0,
            parent_bundle_id: None,
            bundle_metadata: None,
            created_at: fixed_timestamp(),
            updated_at: fixed_timestamp(),
        }
    }

    pub fn bundle_node(id: i64, parent: Option<&NodeId>) -> TreeNode {
        TreeNode {
            id: NodeId::for_bundle(BundleId(id)),
            node_type: NodeKind::Bundle,
            name: format!("bundle {id}"),
            parent_id: parent.cloned(),
            has_children: true,
            children_count: 0,
            asset_count: Some(0),
            child_bundle_count: Some(0),
            asset_kind: None,
            is_container: true,
            processing_status: None,
            created_at: Some(fixed_timestamp()),
            updated_at: Some(fixed_timestamp()),
        }
    }

    pub fn asset_node(id: i64, parent: Option<&NodeId>) -> TreeNode {
        TreeNode {
            id: NodeId::for_asset(AssetId(id)),
            node_type: NodeKind::Asset,
            name: format!("asset {id}"),
            parent_id: parent.cloned(),
            has_children: false,
            children_count: 0,
            asset_count: None,
            child_bundle_count: None,
            asset_kind: Some("text".to_string()),
            is_container: false,
            processing_status: Some("ready".to_string()),
            created_at: Some(fixed_timestamp()),
            updated_at: Some(fixed_timestamp()),
        }
    }

    /// Root snapshot with the given top-level bundles.
    pub fn snapshot_with_bundles(bundle_ids: &[i64]) -> HierarchySnapshot {
        HierarchySnapshot {
            nodes: bundle_ids.iter().map(|&id| bundle_node(id, None)).collect(),
            total_bundles: bundle_ids.len() as u64,
            total_assets: 0,
        }
    }

    /// Children page of `parent` holding the given assets.
    pub fn page_of_assets(parent: &NodeId, asset_ids: &[i64]) -> ChildrenPage {
        ChildrenPage {
            parent_id: parent.clone(),
            children: asset_ids.iter().map(|&id| asset_node(id, Some(parent))).collect(),
            total_children: asset_ids.len() as u64,
            has_more: false,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for cache error variants.

    use super::*;

    #[track_caller]
    pub fn assert_no_active_scope<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::NoActiveScope) => {}
            other => panic!("Expected NoActiveScope, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_gateway_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Gateway(_)) => {}
            other => panic!("Expected Gateway error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_http_status<T: std::fmt::Debug>(result: &CacheResult<T>, status: u16) {
        match result {
            Err(CacheError::Gateway(GatewayError::Http { status: s, .. })) => {
                assert_eq!(*s, status, "Wrong HTTP status");
            }
            other => panic!("Expected HTTP {} error, got: {:?}", status, other),
        }
    }
}
