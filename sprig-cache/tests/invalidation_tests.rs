//! Clearing, resetting and reacting to scope switches.

mod support;

use sprig_core::{AssetId, BundleId, NodeId, ScopeId};
use sprig_test_utils::fixtures::{make_asset, make_bundle, page_of_assets, snapshot_with_bundles};
use sprig_test_utils::{Endpoint, MockGateway};
use std::time::Duration;
use support::{harness, Harness};

async fn populated() -> Harness {
    let parent = NodeId::from("bundle-1");
    let h = harness(
        MockGateway::new()
            .with_hierarchy(ScopeId(1), snapshot_with_bundles(&[1]))
            .with_children(page_of_assets(&parent, &[1, 2]))
            .with_assets([make_asset(1), make_asset(2)])
            .with_bundles([make_bundle(1)]),
        Some(ScopeId(1)),
    );
    h.cache.fetch_root_hierarchy().await.unwrap();
    h.cache.fetch_children(&parent).await.unwrap();
    h.cache.batch_get_assets(&[AssetId(1), AssetId(2)]).await.unwrap();
    h.cache.get_bundle(BundleId(1)).await.unwrap();
    h
}

#[tokio::test]
async fn clear_empties_content_tiers_only() {
    let h = populated().await;
    let stats_before = h.cache.stats();

    h.cache.clear_content_caches().unwrap();

    let sizes = h.cache.sizes().unwrap();
    assert_eq!(sizes.children_pages, 0);
    assert_eq!(sizes.assets, 0);
    assert_eq!(sizes.bundles, 0);
    assert!(h.cache.hierarchy().is_some());
    assert_eq!(h.cache.stats(), stats_before);

    h.cache.fetch_children(&NodeId::from("bundle-1")).await.unwrap();
    assert_eq!(h.gateway.calls(Endpoint::Children), 2);
}

#[tokio::test]
async fn reset_restores_the_initial_state() {
    let h = populated().await;
    h.gateway.fail(Endpoint::Asset);
    assert!(h.cache.get_asset(AssetId(3)).await.is_err());
    assert!(h.cache.error().is_some());

    h.cache.reset().unwrap();

    assert!(h.cache.sizes().unwrap().is_empty());
    assert!(h.cache.stats().is_zero());
    assert!(h.cache.hierarchy().is_none());
    assert!(h.cache.error().is_none());
    assert!(!h.cache.is_loading());
    assert!(h.cache.loading_children().is_empty());

    h.cache.fetch_root_hierarchy().await.unwrap();
    assert_eq!(h.gateway.calls(Endpoint::Hierarchy), 2);
}

#[tokio::test]
async fn root_fetch_pending_across_reset_is_discarded() {
    let h = harness(
        MockGateway::new().with_hierarchy(ScopeId(1), snapshot_with_bundles(&[1])),
        Some(ScopeId(1)),
    );
    h.gateway.hold();
    let pending = {
        let cache = h.cache.clone();
        tokio::spawn(async move { cache.fetch_root_hierarchy().await })
    };
    h.gateway.wait_for_calls(Endpoint::Hierarchy, 1).await;

    h.cache.reset().unwrap();
    assert!(!h.cache.is_loading());

    h.gateway.release();
    pending.await.unwrap().unwrap();
    assert!(h.cache.hierarchy().is_none());
    assert!(!h.cache.is_loading());
}

#[tokio::test]
async fn children_pending_across_reset_are_discarded() {
    let parent = NodeId::from("bundle-5");
    let h = harness(
        MockGateway::new().with_children(page_of_assets(&parent, &[1])),
        Some(ScopeId(1)),
    );
    h.gateway.hold();
    let pending = {
        let cache = h.cache.clone();
        let parent = parent.clone();
        tokio::spawn(async move { cache.fetch_children(&parent).await })
    };
    h.gateway.wait_for_calls(Endpoint::Children, 1).await;

    h.cache.reset().unwrap();
    assert!(h.cache.sizes().unwrap().is_empty());

    h.gateway.release();
    assert!(pending.await.unwrap().is_ok());
    assert!(h.cache.sizes().unwrap().is_empty());
}

#[tokio::test]
async fn scope_listener_clears_on_switch() {
    let h = populated().await;
    let listener = h.cache.spawn_scope_listener(h.scope.subscribe());

    // Same scope: nothing to do.
    assert!(!h.scope.set(Some(ScopeId(1))));
    tokio::task::yield_now().await;
    assert_eq!(h.cache.sizes().unwrap().assets, 2);

    assert!(h.scope.set(Some(ScopeId(2))));
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.cache.sizes().unwrap().assets != 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let sizes = h.cache.sizes().unwrap();
    assert_eq!(sizes.children_pages, 0);
    assert_eq!(sizes.bundles, 0);
    assert!(h.cache.hierarchy().is_none());

    listener.abort();
}
