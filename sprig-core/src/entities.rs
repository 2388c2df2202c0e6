//! Fully hydrated entity payloads

use crate::identity::{AssetId, BundleId, NodeId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Which hydration keyspace an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Asset,
    Bundle,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Asset => f.write_str("asset"),
            EntityKind::Bundle => f.write_str("bundle"),
        }
    }
}

/// Marker trait for payloads that can sit in a hydration tier.
///
/// - `KIND` names the keyspace; asset and bundle ids never collide because
///   each kind gets its own tier.
/// - `entity_id()` must be the id the payload is cached under.
pub trait HydratedEntity: fmt::Debug + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    const KIND: EntityKind;

    fn entity_id(&self) -> Self::Id;
}

/// Complete asset payload, including content the tree summary omits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Asset {
    pub id: AssetId,
    pub title: String,
    pub kind: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_asset_id: Option<AssetId>,
    #[serde(default)]
    pub part_index: Option<i64>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub blob_path: Option<String>,
    #[serde(default)]
    pub source_identifier: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    #[serde(default)]
    pub source_metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl HydratedEntity for Asset {
    type Id = AssetId;

    const KIND: EntityKind = EntityKind::Asset;

    fn entity_id(&self) -> AssetId {
        self.id
    }
}

/// Complete bundle payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Bundle {
    pub id: BundleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub asset_count: u64,
    #[serde(default)]
    pub child_bundle_count: u64,
    #[serde(default)]
    pub parent_bundle_id: Option<BundleId>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    #[serde(default)]
    pub bundle_metadata: Option<serde_json::Value>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl HydratedEntity for Bundle {
    type Id = BundleId;

    const KIND: EntityKind = EntityKind::Bundle;

    fn entity_id(&self) -> BundleId {
        self.id
    }
}

/// A hydrated entity of either kind, as handed out by the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum FullEntity {
    Asset(Arc<Asset>),
    Bundle(Arc<Bundle>),
}

impl FullEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            FullEntity::Asset(_) => EntityKind::Asset,
            FullEntity::Bundle(_) => EntityKind::Bundle,
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            FullEntity::Asset(asset) => NodeId::for_asset(asset.id),
            FullEntity::Bundle(bundle) => NodeId::for_bundle(bundle.id),
        }
    }

    pub fn as_asset(&self) -> Option<&Arc<Asset>> {
        match self {
            FullEntity::Asset(asset) => Some(asset),
            FullEntity::Bundle(_) => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&Arc<Bundle>> {
        match self {
            FullEntity::Bundle(bundle) => Some(bundle),
            FullEntity::Asset(_) => None,
        }
    }
}
