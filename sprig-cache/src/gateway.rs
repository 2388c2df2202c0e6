//! Remote tree gateway contract.
//!
//! The cache never talks to the network directly; every fetch goes through a
//! [`TreeGateway`]. `sprig-client` provides the HTTP implementation and
//! `sprig-test-utils` a scriptable mock.

use async_trait::async_trait;
use sprig_core::{
    Asset, AssetId, Bundle, BundleId, ChildrenPage, GatewayError, HierarchySnapshot, NodeId,
    ScopeId,
};
use std::sync::Arc;

/// Remote retrieval service for the hierarchy and its entities.
#[async_trait]
pub trait TreeGateway: Send + Sync {
    /// Fetch the root level of the hierarchy for a scope.
    async fn get_hierarchy(&self, scope: ScopeId) -> Result<HierarchySnapshot, GatewayError>;

    /// Fetch one page (at most `limit` nodes) of a node's children.
    async fn get_children(
        &self,
        scope: ScopeId,
        parent_id: &NodeId,
        limit: u32,
    ) -> Result<ChildrenPage, GatewayError>;

    /// Fetch one fully hydrated asset.
    async fn get_asset(&self, scope: ScopeId, id: AssetId) -> Result<Asset, GatewayError>;

    /// Fetch one fully hydrated bundle. Bundle ids are global, so no scope.
    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, GatewayError>;

    /// Fetch many assets in one round trip. Result order is unspecified and
    /// unknown ids may simply be absent.
    async fn batch_get_assets(
        &self,
        scope: ScopeId,
        ids: &[AssetId],
    ) -> Result<Vec<Asset>, GatewayError>;
}

#[async_trait]
impl<G: TreeGateway + ?Sized> TreeGateway for Arc<G> {
    async fn get_hierarchy(&self, scope: ScopeId) -> Result<HierarchySnapshot, GatewayError> {
        (**self).get_hierarchy(scope).await
    }

    async fn get_children(
        &self,
        scope: ScopeId,
        parent_id: &NodeId,
        limit: u32,
    ) -> Result<ChildrenPage, GatewayError> {
        (**self).get_children(scope, parent_id, limit).await
    }

    async fn get_asset(&self, scope: ScopeId, id: AssetId) -> Result<Asset, GatewayError> {
        (**self).get_asset(scope, id).await
    }

    async fn get_bundle(&self, id: BundleId) -> Result<Bundle, GatewayError> {
        (**self).get_bundle(id).await
    }

    async fn batch_get_assets(
        &self,
        scope: ScopeId,
        ids: &[AssetId],
    ) -> Result<Vec<Asset>, GatewayError> {
        (**self).batch_get_assets(scope, ids).await
    }
}
