//! Sprig Core - Tree Node and Entity Types
//!
//! Pure data structures shared by the cache, the HTTP gateway and tests.
//! This crate contains ONLY data types and errors - no caching logic.

pub mod entities;
pub mod error;
pub mod identity;
pub mod node;

pub use entities::{Asset, Bundle, EntityKind, FullEntity, HydratedEntity};
pub use error::{CacheError, CacheResult, GatewayError};
pub use identity::{AssetId, BundleId, NodeId, NodeKind, NodeRef, ScopeId, Timestamp};
pub use node::{ChildrenPage, HierarchySnapshot, TreeNode};
