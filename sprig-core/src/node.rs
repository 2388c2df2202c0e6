//! Lightweight hierarchy summaries

use crate::error::CacheResult;
use crate::identity::{NodeId, NodeKind, NodeRef, Timestamp};
use serde::{Deserialize, Serialize};

/// Minimal summary of one node in the hierarchy. Carries no payload; see
/// [`crate::Asset`] and [`crate::Bundle`] for the hydrated forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeKind,
    pub name: String,
    /// `None` marks a root node.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub has_children: bool,
    /// Descendant count hint.
    #[serde(default)]
    pub children_count: u64,
    #[serde(default)]
    pub asset_count: Option<u64>,
    #[serde(default)]
    pub child_bundle_count: Option<u64>,
    /// Asset kind (`pdf`, `csv_row`, ...). Bundles leave this empty.
    #[serde(default, rename = "kind")]
    pub asset_kind: Option<String>,
    #[serde(default)]
    pub is_container: bool,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl TreeNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn node_ref(&self) -> CacheResult<NodeRef> {
        self.id.node_ref()
    }
}

/// Root level of the hierarchy for one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HierarchySnapshot {
    pub nodes: Vec<TreeNode>,
    #[serde(default)]
    pub total_bundles: u64,
    #[serde(default)]
    pub total_assets: u64,
}

impl HierarchySnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// One bounded page of a node's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChildrenPage {
    pub parent_id: NodeId,
    pub children: Vec<TreeNode>,
    #[serde(default)]
    pub total_children: u64,
    #[serde(default)]
    pub has_more: bool,
}

impl ChildrenPage {
    pub fn empty(parent_id: NodeId) -> Self {
        Self {
            parent_id,
            children: Vec::new(),
            total_children: 0,
            has_more: false,
        }
    }
}
