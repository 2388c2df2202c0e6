//! Identity types for tree nodes and hydrated entities

use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Active collection ("infospace") the cache is valid for.
    ScopeId
);
numeric_id!(
    /// Asset identifier. Disjoint from [`BundleId`].
    AssetId
);
numeric_id!(
    /// Bundle (container) identifier. Disjoint from [`AssetId`].
    BundleId
);

/// Discriminant of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Asset,
    Bundle,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Asset => "asset",
            NodeKind::Bundle => "bundle",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(NodeKind::Asset),
            "bundle" => Ok(NodeKind::Bundle),
            other => Err(format!("unknown node kind '{}'", other)),
        }
    }
}

/// Opaque tree node identifier, unique within one scope.
///
/// The service encodes ids as `"<kind>-<numeric id>"`, e.g. `bundle-12` or
/// `asset-904`. The cache treats them as opaque keys; [`NodeRef::parse`]
/// recovers the structure when a node has to be hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn for_asset(id: AssetId) -> Self {
        Self(format!("asset-{}", id))
    }

    pub fn for_bundle(id: BundleId) -> Self {
        Self(format!("bundle-{}", id))
    }

    /// Parse this id into its kind and numeric id.
    pub fn node_ref(&self) -> CacheResult<NodeRef> {
        NodeRef::parse(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Structured form of a [`NodeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Asset(AssetId),
    Bundle(BundleId),
}

impl NodeRef {
    /// Parse `"bundle-123"` / `"asset-456"`.
    pub fn parse(raw: &str) -> CacheResult<Self> {
        let invalid = |reason: String| CacheError::InvalidNodeId {
            id: raw.to_string(),
            reason,
        };

        let (kind, numeric) = raw
            .split_once('-')
            .ok_or_else(|| invalid("expected '<kind>-<id>'".to_string()))?;
        let kind = NodeKind::from_str(kind).map_err(invalid)?;
        let numeric = numeric
            .parse::<i64>()
            .map_err(|e| invalid(format!("numeric part: {}", e)))?;

        Ok(match kind {
            NodeKind::Asset => NodeRef::Asset(AssetId(numeric)),
            NodeKind::Bundle => NodeRef::Bundle(BundleId(numeric)),
        })
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Asset(_) => NodeKind::Asset,
            NodeRef::Bundle(_) => NodeKind::Bundle,
        }
    }

    pub fn to_node_id(&self) -> NodeId {
        match self {
            NodeRef::Asset(id) => NodeId::for_asset(*id),
            NodeRef::Bundle(id) => NodeId::for_bundle(*id),
        }
    }
}
